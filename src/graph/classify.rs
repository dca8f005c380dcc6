//! Style classes for vertices and edges, and the style sheet that targets them.

use std::fmt;

use super::records::{EdgeRecord, EntityRecord};
use super::schema::{Schema, TypeDescriptor, TypeTable, part_text};
use super::vertex::Vertex;
use crate::config::{GraphConfiguration, StyleMap};
use crate::error::Result;

/// A style tag attached to an element on the rendering surface.
///
/// Kept as a tagged value inside the engine and rendered to text only when handed to
/// the surface (see the [`fmt::Display`] impl).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StyleClass {
	/// Carried by every vertex.
	DefaultVertex,
	/// Carried by every edge.
	DefaultEdge,
	/// The vertex's schema type.
	Type(String),
	/// A part of the vertex took a specific value.
	FieldOverride {
		/// Schema type name.
		type_name: String,
		/// Part name.
		field: String,
		/// Part value as text.
		value: String,
	},
	/// The vertex is backed by entity records.
	EntityWrapper,
	/// The edge's group.
	Group(String),
	/// Hidden by the live text filter.
	Filtered,
}

impl fmt::Display for StyleClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StyleClass::DefaultVertex => f.write_str("defaultVertex"),
			StyleClass::DefaultEdge => f.write_str("defaultEdge"),
			StyleClass::Type(name) => write!(f, "type:{name}"),
			StyleClass::FieldOverride {
				type_name,
				field,
				value,
			} => write!(f, "type:{type_name}:{field}:{value}"),
			StyleClass::EntityWrapper => f.write_str("entity"),
			StyleClass::Group(group) => write!(f, "group:{group}"),
			StyleClass::Filtered => f.write_str("filtered"),
		}
	}
}

/// Insertion-ordered set of style classes.
///
/// Equality is set equality: the order classes arrived in never affects styling.
#[derive(Clone, Debug, Default)]
pub struct ClassSet(Vec<StyleClass>);

impl ClassSet {
	/// An empty set.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a class; returns `false` if it was already present.
	pub fn insert(&mut self, class: StyleClass) -> bool {
		if self.0.contains(&class) {
			return false;
		}
		self.0.push(class);
		true
	}

	/// Removes a class; returns `false` if it was absent.
	pub fn remove(&mut self, class: &StyleClass) -> bool {
		let before = self.0.len();
		self.0.retain(|c| c != class);
		self.0.len() != before
	}

	/// Union with `other`, keeping the classes already present first.
	pub fn merge(&mut self, other: &ClassSet) {
		for class in &other.0 {
			self.insert(class.clone());
		}
	}

	/// Whether `class` is in the set.
	pub fn contains(&self, class: &StyleClass) -> bool {
		self.0.contains(class)
	}

	/// Classes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &StyleClass> {
		self.0.iter()
	}

	/// Number of classes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Whether the set is empty.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Class names as handed to the rendering surface.
	pub fn names(&self) -> Vec<String> {
		self.0.iter().map(ToString::to_string).collect()
	}
}

impl PartialEq for ClassSet {
	fn eq(&self, other: &Self) -> bool {
		self.len() == other.len() && self.iter().all(|c| other.contains(c))
	}
}

impl Eq for ClassSet {}

impl FromIterator<StyleClass> for ClassSet {
	fn from_iter<I: IntoIterator<Item = StyleClass>>(iter: I) -> Self {
		let mut set = ClassSet::new();
		for class in iter {
			set.insert(class);
		}
		set
	}
}

/// Classes derived for one edge record: one set per endpoint plus the edge's own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeClasses {
	/// Source vertex classes.
	pub source: ClassSet,
	/// Destination vertex classes.
	pub destination: ClassSet,
	/// The edge's own classes.
	pub edge: ClassSet,
}

/// Derives style classes from the schema and type table.
#[derive(Clone, Copy)]
pub struct Classifier<'a> {
	schema: &'a Schema,
	types: &'a TypeTable,
}

impl<'a> Classifier<'a> {
	/// A classifier over `schema` and `types`.
	pub fn new(schema: &'a Schema, types: &'a TypeTable) -> Self {
		Self { schema, types }
	}

	/// Default and type classes, one field override per part, and the entity wrapper
	/// when `is_entity` is set.
	pub fn classes_for_vertex(
		&self,
		vertex: &Vertex,
		descriptor: &TypeDescriptor,
		is_entity: bool,
	) -> ClassSet {
		let mut classes: ClassSet = [
			StyleClass::DefaultVertex,
			StyleClass::Type(descriptor.name.clone()),
		]
		.into_iter()
		.collect();
		for (field, value) in self.types.parts(&descriptor.class, vertex).iter() {
			classes.insert(StyleClass::FieldOverride {
				type_name: descriptor.name.clone(),
				field: field.to_owned(),
				value: part_text(value),
			});
		}
		if is_entity {
			classes.insert(StyleClass::EntityWrapper);
		}
		classes
	}

	/// Classes of an entity's vertex, including the entity wrapper.
	pub fn classes_for_entity(&self, entity: &EntityRecord) -> Result<ClassSet> {
		let descriptor = self.schema.vertex_type_for_entity_group(&entity.group)?;
		Ok(self.classes_for_vertex(&entity.vertex, &descriptor, true))
	}

	/// Classes of both endpoints and of the edge itself.
	pub fn classes_for_edge(&self, edge: &EdgeRecord) -> Result<EdgeClasses> {
		let ends = self.schema.vertex_types_for_edge_group(&edge.group)?;
		Ok(EdgeClasses {
			source: self.classes_for_vertex(&edge.source, &ends.source, false),
			destination: self.classes_for_vertex(&edge.destination, &ends.destination, false),
			edge: [StyleClass::DefaultEdge, StyleClass::Group(edge.group.clone())]
				.into_iter()
				.collect(),
		})
	}
}

/// One style sheet entry: every element carrying `selector` receives `style`.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleRule {
	/// Class the rule targets.
	pub selector: StyleClass,
	/// Properties applied.
	pub style: StyleMap,
}

/// Builds the style sheet for a configuration. Later rules win.
pub fn stylesheet(config: &GraphConfiguration) -> Vec<StyleRule> {
	let defaults = &config.default_style;
	let mut rules = vec![
		rule(StyleClass::DefaultEdge, &defaults.edges),
		rule(StyleClass::DefaultVertex, &defaults.vertices),
		rule(StyleClass::EntityWrapper, &defaults.entity_wrapper),
	];

	if let Some(style) = &config.style {
		for (type_name, type_style) in &style.vertex_types {
			if let Some(s) = &type_style.style {
				rules.push(rule(StyleClass::Type(type_name.clone()), s));
			}
			for (field, values) in &type_style.field_overrides {
				for (value, s) in values {
					let selector = StyleClass::FieldOverride {
						type_name: type_name.clone(),
						field: field.clone(),
						value: value.clone(),
					};
					rules.push(rule(selector, s));
				}
			}
		}
		for (group, s) in &style.edges {
			rules.push(rule(StyleClass::Group(group.clone()), s));
		}
	}

	let mut hidden = StyleMap::new();
	hidden.insert("display".into(), "none".into());
	rules.push(StyleRule {
		selector: StyleClass::Filtered,
		style: hidden,
	});
	rules
}

fn rule(selector: StyleClass, style: &StyleMap) -> StyleRule {
	StyleRule {
		selector,
		style: style.clone(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::GraphError;
	use crate::graph::testing::{edge, entity, sample_schema};
	use serde_json::json;

	fn names(set: &ClassSet) -> Vec<String> {
		set.names()
	}

	#[test]
	fn entity_classes() {
		let (schema, types) = (sample_schema(), TypeTable::default());
		let classifier = Classifier::new(&schema, &types);
		let classes = classifier.classes_for_entity(&entity("foo")).unwrap();
		assert_eq!(
			names(&classes),
			[
				"defaultVertex",
				"type:vertex",
				"type:vertex:value:foo",
				"entity"
			]
		);
	}

	#[test]
	fn edge_endpoints_are_not_entities() {
		let (schema, types) = (sample_schema(), TypeTable::default());
		let classifier = Classifier::new(&schema, &types);
		let classes = classifier.classes_for_edge(&edge("foo", "bar")).unwrap();
		assert!(!classes.source.contains(&StyleClass::EntityWrapper));
		assert!(classes.destination.contains(&StyleClass::FieldOverride {
			type_name: "vertex".into(),
			field: "value".into(),
			value: "bar".into(),
		}));
		assert_eq!(names(&classes.edge), ["defaultEdge", "group:foobarEdge"]);
	}

	#[test]
	fn structured_vertices_get_one_override_per_part() {
		let mut schema = sample_schema();
		schema.types.get_mut("vertex").unwrap().class =
			"uk.gov.gchq.gaffer.types.TypeValue".into();
		let types = TypeTable::default();
		let classifier = Classifier::new(&schema, &types);
		let mut record = entity("ignored");
		record.vertex =
			json!({"uk.gov.gchq.gaffer.types.TypeValue": {"type": "t1", "value": "v1"}});
		let classes = classifier.classes_for_entity(&record).unwrap();
		assert!(classes.contains(&StyleClass::FieldOverride {
			type_name: "vertex".into(),
			field: "type".into(),
			value: "t1".into(),
		}));
		assert_eq!(classes.len(), 5);
	}

	#[test]
	fn unknown_groups_surface_as_errors() {
		let (schema, types) = (sample_schema(), TypeTable::default());
		let classifier = Classifier::new(&schema, &types);
		let mut record = entity("foo");
		record.group = "Unknown".into();
		assert!(matches!(
			classifier.classes_for_entity(&record),
			Err(GraphError::UnknownEntityGroup(_))
		));
	}

	#[test]
	fn class_sets_are_idempotent_and_order_free() {
		let mut a: ClassSet = [StyleClass::DefaultVertex, StyleClass::EntityWrapper]
			.into_iter()
			.collect();
		assert!(!a.insert(StyleClass::DefaultVertex));
		let b: ClassSet = [StyleClass::EntityWrapper, StyleClass::DefaultVertex]
			.into_iter()
			.collect();
		assert_eq!(a, b);
		a.merge(&b);
		assert_eq!(a.len(), 2);
	}

	#[test]
	fn stylesheet_targets_types_overrides_and_groups() {
		let doc = json!({"graph": {"style": {
			"vertexTypes": {"vertex": {
				"style": {"background-color": "red"},
				"fieldOverrides": {"value": {"foo": {"background-color": "blue"}}}
			}},
			"edges": {"foobarEdge": {"line-color": "green"}}
		}}});
		let config = GraphConfiguration::from_provider(&doc).unwrap();
		let selectors: Vec<String> = stylesheet(&config)
			.iter()
			.map(|r| r.selector.to_string())
			.collect();
		assert_eq!(
			selectors,
			[
				"defaultEdge",
				"defaultVertex",
				"entity",
				"type:vertex",
				"type:vertex:value:foo",
				"group:foobarEdge",
				"filtered"
			]
		);
	}

	#[test]
	fn stylesheet_without_style_has_only_defaults() {
		let rules = stylesheet(&GraphConfiguration::default());
		assert_eq!(rules.len(), 4);
		assert_eq!(rules[3].style["display"], json!("none"));
	}
}
