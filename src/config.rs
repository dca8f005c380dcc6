//! Graph configuration, the per-application session cache and query settings.
//!
//! A configuration provider serves a document of the form
//!
//! ```json
//! { "graph": { "physics": {...}, "style": {...}, "defaultStyle": {...} } }
//! ```
//!
//! `physics` and `defaultStyle` are deep-merged over the built-in defaults, `style`
//! replaces the (empty) default, and anything missing keeps its default value.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::Result;

/// CSS-like style properties keyed by property name.
pub type StyleMap = Map<String, Value>;

/// Force simulation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Physics {
	/// Repulsion between nodes.
	pub charge_force: f32,
	/// Edge spring stiffness.
	pub spring_force: f32,
	/// Cap on the force applied to a node per step.
	pub max_force: f32,
	/// Velocity scale.
	pub node_speed: f32,
	/// Velocity kept per step.
	pub damping: f32,
}

impl Default for Physics {
	fn default() -> Self {
		Self {
			charge_force: 150.0,
			spring_force: 0.05,
			max_force: 100.0,
			node_speed: 3000.0,
			damping: 0.9,
		}
	}
}

/// Styles applied to every vertex, edge and entity wrapper.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultStyle {
	/// Applied to every edge.
	pub edges: StyleMap,
	/// Applied to every vertex.
	pub vertices: StyleMap,
	/// Applied to vertices backed by entity records.
	pub entity_wrapper: StyleMap,
}

impl Default for DefaultStyle {
	fn default() -> Self {
		Self {
			edges: style_map(json!({
				"curve-style": "bezier",
				"min-zoomed-font-size": 35,
				"text-outline-color": "#538212",
				"text-outline-width": 3,
				"line-color": "#538212",
				"target-arrow-color": "#538212",
				"target-arrow-shape": "triangle",
				"font-size": 14,
				"color": "#FFFFFF",
				"width": 5
			})),
			vertices: style_map(json!({
				"height": 30,
				"width": 30,
				"min-zoomed-font-size": 20,
				"font-size": 14,
				"text-valign": "center",
				"color": "#333333",
				"text-outline-color": "#FFFFFF",
				"background-color": "#FFFFFF",
				"text-outline-width": 3
			})),
			entity_wrapper: style_map(json!({
				"height": 60,
				"width": 60,
				"border-width": 2,
				"border-color": "#55555"
			})),
		}
	}
}

/// Per-type vertex styling, with optional overrides for specific field values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexTypeStyle {
	/// Base style of the type.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<StyleMap>,
	/// field -> field value -> style
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub field_overrides: BTreeMap<String, BTreeMap<String, StyleMap>>,
}

/// Per-type vertex and per-group edge styles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
	/// Keyed by schema type name.
	#[serde(default)]
	pub vertex_types: BTreeMap<String, VertexTypeStyle>,
	/// Keyed by edge group.
	#[serde(default)]
	pub edges: BTreeMap<String, StyleMap>,
}

/// Layout and styling configuration of the graph view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfiguration {
	/// Layout name.
	pub name: String,
	/// Force simulation parameters.
	pub physics: Physics,
	/// Simulation steps run on each layout pass.
	pub iterations: u32,
	/// Fit the view to the graph after layout.
	pub fit: bool,
	/// Keep simulating after the layout pass.
	pub animate: bool,
	/// Type and group styles.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub style: Option<StyleConfig>,
	/// Styles every element receives.
	pub default_style: DefaultStyle,
}

impl Default for GraphConfiguration {
	fn default() -> Self {
		Self {
			name: "force-graph".into(),
			physics: Physics::default(),
			iterations: 300,
			fit: true,
			animate: false,
			style: None,
			default_style: DefaultStyle::default(),
		}
	}
}

impl GraphConfiguration {
	/// Applies a provider document over the built-in defaults.
	pub fn from_provider(doc: &Value) -> Result<Self> {
		let Some(graph) = doc.get("graph") else {
			debug!("No graph configuration supplied, using defaults");
			return Ok(Self::default());
		};
		let mut merged = serde_json::to_value(Self::default())?;
		if let Some(physics) = graph.get("physics") {
			deep_merge(&mut merged["physics"], physics);
		}
		if let Some(style) = graph.get("style") {
			merged["style"] = style.clone();
		}
		if let Some(default_style) = graph.get("defaultStyle") {
			deep_merge(&mut merged["defaultStyle"], default_style);
		}
		Ok(serde_json::from_value(merged)?)
	}
}

/// Recursively merges `overlay` into `base`; objects merge key by key, anything else
/// replaces.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
	match (base, overlay) {
		(Value::Object(base), Value::Object(overlay)) => {
			for (k, v) in overlay {
				deep_merge(base.entry(k.clone()).or_insert(Value::Null), v);
			}
		}
		(base, overlay) => *base = overlay.clone(),
	}
}

fn style_map(value: Value) -> StyleMap {
	match value {
		Value::Object(map) => map,
		_ => StyleMap::new(),
	}
}

/// State that outlives a single graph view: the resolved configuration and the
/// live search term.
#[derive(Clone, Debug, Default)]
pub struct GraphSession {
	configuration: Option<GraphConfiguration>,
	search_term: Option<String>,
}

impl GraphSession {
	/// Configuration loaded by the first view, if any.
	pub fn configuration(&self) -> Option<&GraphConfiguration> {
		self.configuration.as_ref()
	}

	/// Caches a loaded configuration.
	pub fn set_configuration(&mut self, configuration: GraphConfiguration) {
		self.configuration = Some(configuration);
	}

	/// Search term, if one has been entered and is not blank.
	pub fn search_term(&self) -> Option<&str> {
		self.search_term.as_deref().filter(|t| !t.is_empty())
	}

	/// Remembers the live search term.
	pub fn set_search_term(&mut self, term: impl Into<String>) {
		self.search_term = Some(term.into());
	}
}

/// Settings applied to every query the graph view issues.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSettings {
	/// Maximum number of results a query returns.
	pub result_limit: usize,
	/// Options attached to every operation.
	#[serde(default)]
	pub default_options: BTreeMap<String, String>,
}

impl Default for OperationSettings {
	fn default() -> Self {
		Self {
			result_limit: 100,
			default_options: BTreeMap::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		let config = GraphConfiguration::from_provider(&json!({})).unwrap();
		assert_eq!(config, GraphConfiguration::default());
	}

	#[test]
	fn physics_is_merged_not_replaced() {
		let doc = json!({"graph": {"physics": {"damping": 0.5}}});
		let config = GraphConfiguration::from_provider(&doc).unwrap();
		assert_eq!(config.physics.damping, 0.5);
		assert_eq!(config.physics.charge_force, 150.0);
		assert_eq!(config.physics.node_speed, 3000.0);
	}

	#[test]
	fn default_style_is_merged_and_style_replaced() {
		let doc = json!({"graph": {
			"defaultStyle": {"entityWrapper": {"height": 500}},
			"style": {"edges": {"myEdgeType": {"line-color": "blue"}}}
		}});
		let config = GraphConfiguration::from_provider(&doc).unwrap();

		let wrapper = &config.default_style.entity_wrapper;
		assert_eq!(wrapper["height"], json!(500));
		assert_eq!(wrapper["width"], json!(60));
		assert_eq!(config.default_style.vertices, DefaultStyle::default().vertices);

		let style = config.style.unwrap();
		assert!(style.vertex_types.is_empty());
		assert_eq!(style.edges["myEdgeType"]["line-color"], json!("blue"));
	}

	#[test]
	fn malformed_documents_are_rejected() {
		let doc = json!({"graph": {"physics": {"damping": "heavy"}}});
		assert!(GraphConfiguration::from_provider(&doc).is_err());
	}

	#[test]
	fn blank_search_terms_are_ignored() {
		let mut session = GraphSession::default();
		assert_eq!(session.search_term(), None);
		session.set_search_term("");
		assert_eq!(session.search_term(), None);
		session.set_search_term("ba");
		assert_eq!(session.search_term(), Some("ba"));
	}
}
