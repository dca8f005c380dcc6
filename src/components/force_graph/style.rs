//! Resolves style sheet rules into the handful of properties the canvas draws with.

use serde_json::Value;

use crate::config::StyleMap;
use crate::graph::{ClassSet, StyleRule};

/// Cytoscape-style sizes are in pixels at zoom 1; the canvas draws smaller.
const SIZE_SCALE: f64 = 1.0 / 3.0;

/// Drawing properties of one element.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
	/// `display: none`.
	pub hidden: bool,
	/// Node fill.
	pub background_color: String,
	/// Node radius in world units.
	pub radius: f64,
	/// Node outline width; zero draws none.
	pub border_width: f64,
	/// Node outline colour.
	pub border_color: String,
	/// Label text colour.
	pub label_color: String,
	/// Label size at zoom 1.
	pub font_size: f64,
	/// Edge colour.
	pub line_color: String,
	/// Edge width at zoom 1.
	pub line_width: f64,
	/// Whether edges end in an arrow head.
	pub arrow: bool,
}

impl Default for ResolvedStyle {
	fn default() -> Self {
		Self {
			hidden: false,
			background_color: "#999999".into(),
			radius: 5.0,
			border_width: 0.0,
			border_color: "#555555".into(),
			label_color: "#ffffff".into(),
			font_size: 10.0,
			line_color: "rgb(100, 180, 255)".into(),
			line_width: 1.5,
			arrow: true,
		}
	}
}

/// Folds every rule whose selector the element carries, in sheet order.
pub fn resolve_map(rules: &[StyleRule], classes: &ClassSet) -> StyleMap {
	let mut merged = StyleMap::new();
	for rule in rules.iter().filter(|r| classes.contains(&r.selector)) {
		for (k, v) in &rule.style {
			merged.insert(k.clone(), v.clone());
		}
	}
	merged
}

impl ResolvedStyle {
	/// Style of an element carrying `classes`.
	pub fn resolve(rules: &[StyleRule], classes: &ClassSet) -> Self {
		Self::from_map(&resolve_map(rules, classes))
	}

	/// Reads the drawn properties out of a merged style map.
	pub fn from_map(map: &StyleMap) -> Self {
		let d = Self::default();
		let size = number(map, "width").or_else(|| number(map, "height"));
		Self {
			hidden: text(map, "display").is_some_and(|s| s == "none"),
			background_color: text(map, "background-color").unwrap_or(d.background_color),
			radius: size.map(|s| s * SIZE_SCALE / 2.0).unwrap_or(d.radius),
			border_width: number(map, "border-width")
				.map(|w| w * SIZE_SCALE)
				.unwrap_or(d.border_width),
			border_color: text(map, "border-color").unwrap_or(d.border_color),
			label_color: text(map, "color").unwrap_or(d.label_color),
			font_size: number(map, "font-size")
				.map(|s| s * 0.75)
				.unwrap_or(d.font_size),
			line_color: text(map, "line-color").unwrap_or(d.line_color),
			line_width: size.map(|w| w * 0.3).unwrap_or(d.line_width),
			arrow: text(map, "target-arrow-shape").is_none_or(|s| s != "none"),
		}
	}
}

fn text(map: &StyleMap, key: &str) -> Option<String> {
	match map.get(key)? {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Numbers may be given bare or as `"30px"`.
fn number(map: &StyleMap, key: &str) -> Option<f64> {
	match map.get(key)? {
		Value::Number(n) => n.as_f64(),
		Value::String(s) => s.trim_end_matches("px").trim().parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::GraphConfiguration;
	use crate::graph::{StyleClass, stylesheet};
	use serde_json::json;

	#[test]
	fn later_rules_win_and_membership_is_all_that_matters() {
		let doc = json!({"graph": {"style": {"vertexTypes": {"vertex": {
			"style": {"background-color": "red"},
			"fieldOverrides": {"value": {"foo": {"background-color": "blue"}}}
		}}}}});
		let rules = stylesheet(&GraphConfiguration::from_provider(&doc).unwrap());
		let override_class = StyleClass::FieldOverride {
			type_name: "vertex".into(),
			field: "value".into(),
			value: "foo".into(),
		};
		let a: ClassSet = [
			override_class.clone(),
			StyleClass::Type("vertex".into()),
			StyleClass::DefaultVertex,
		]
		.into_iter()
		.collect();
		let b: ClassSet = [
			StyleClass::DefaultVertex,
			StyleClass::Type("vertex".into()),
			override_class,
		]
		.into_iter()
		.collect();
		let style = ResolvedStyle::resolve(&rules, &a);
		assert_eq!(style.background_color, "blue");
		assert_eq!(style, ResolvedStyle::resolve(&rules, &b));
		assert_eq!(style.radius, 5.0);
	}

	#[test]
	fn filtered_elements_are_hidden() {
		let rules = stylesheet(&GraphConfiguration::default());
		let classes: ClassSet = [StyleClass::DefaultVertex, StyleClass::Filtered]
			.into_iter()
			.collect();
		assert!(ResolvedStyle::resolve(&rules, &classes).hidden);
	}

	#[test]
	fn pixel_strings_parse() {
		let map = json!({"width": "60px", "target-arrow-shape": "none"});
		let style = ResolvedStyle::from_map(map.as_object().unwrap());
		assert_eq!(style.radius, 10.0);
		assert!(!style.arrow);
	}
}
