//! Schema model and the value-class type table.
//!
//! The schema tells the engine which vertex type governs an entity group or either end
//! of an edge group. The type table knows how a value class decomposes into named parts,
//! which drives field-override style classes, query-builder inputs and short labels.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::vertex::{ShortForm, Vertex, identify, literal};
use crate::error::{GraphError, Result};

/// A declared type: maps a schema type name to its value class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDefinition {
	/// Value class, e.g. `java.lang.String`.
	pub class: String,
	/// Free text.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

/// An entity group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDefinition {
	/// Type of the entity's vertex.
	pub vertex: String,
}

/// An edge group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDefinition {
	/// Type of the source vertex.
	pub source: String,
	/// Type of the destination vertex.
	pub destination: String,
}

/// Schema as served by the schema provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
	/// Types by name.
	#[serde(default)]
	pub types: BTreeMap<String, TypeDefinition>,
	/// Entity groups by name.
	#[serde(default)]
	pub entities: BTreeMap<String, EntityDefinition>,
	/// Edge groups by name.
	#[serde(default)]
	pub edges: BTreeMap<String, EdgeDefinition>,
}

/// A resolved vertex type: the type name together with its definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
	/// Type name.
	pub name: String,
	/// Value class.
	pub class: String,
}

/// Types governing the two ends of an edge group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeVertexTypes {
	/// Source end.
	pub source: TypeDescriptor,
	/// Destination end.
	pub destination: TypeDescriptor,
}

impl Schema {
	/// Resolves a type name to its descriptor.
	pub fn vertex_type(&self, name: &str) -> Result<TypeDescriptor> {
		let def = self
			.types
			.get(name)
			.ok_or_else(|| GraphError::UnknownType(name.to_owned()))?;
		Ok(TypeDescriptor {
			name: name.to_owned(),
			class: def.class.clone(),
		})
	}

	/// Type of an entity group's vertex.
	pub fn vertex_type_for_entity_group(&self, group: &str) -> Result<TypeDescriptor> {
		let def = self
			.entities
			.get(group)
			.ok_or_else(|| GraphError::UnknownEntityGroup(group.to_owned()))?;
		self.vertex_type(&def.vertex)
	}

	/// Types at both ends of an edge group.
	pub fn vertex_types_for_edge_group(&self, group: &str) -> Result<EdgeVertexTypes> {
		let def = self
			.edges
			.get(group)
			.ok_or_else(|| GraphError::UnknownEdgeGroup(group.to_owned()))?;
		Ok(EdgeVertexTypes {
			source: self.vertex_type(&def.source)?,
			destination: self.vertex_type(&def.destination)?,
		})
	}

	/// Type names usable as seeds: every type referenced as an entity vertex or an
	/// edge end, in first-seen order.
	pub fn vertex_type_names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = Vec::new();
		let ends = self
			.entities
			.values()
			.map(|e| e.vertex.as_str())
			.chain(
				self.edges
					.values()
					.flat_map(|e| [e.source.as_str(), e.destination.as_str()]),
			);
		for name in ends {
			if !names.contains(&name) {
				names.push(name);
			}
		}
		names
	}

	/// Value class used for seeds that carry no group of their own.
	pub fn seed_value_class(&self) -> Result<String> {
		let name = self
			.vertex_type_names()
			.first()
			.map(|n| n.to_string())
			.ok_or_else(|| GraphError::UnknownType("<no schema vertices>".into()))?;
		Ok(self.vertex_type(&name)?.class)
	}
}

/// Named parts a vertex decomposes into, in declared order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parts(Vec<(String, Value)>);

impl Parts {
	/// Parts in declared order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Whether there are no parts.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// A part by name.
	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.iter().find(|(k, _)| k == field).map(|(_, v)| v)
	}
}

impl FromIterator<(String, Value)> for Parts {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Parts(iter.into_iter().collect())
	}
}

impl Serialize for Parts {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.0.len()))?;
		for (k, v) in &self.0 {
			map.serialize_entry(k, v)?;
		}
		map.end()
	}
}

/// Text of a part value as used in style classes and labels.
pub fn part_text(value: &Value) -> String {
	literal(value).unwrap_or_else(|| identify(value))
}

/// Field layout of known value classes.
#[derive(Clone, Debug)]
pub struct TypeTable {
	classes: BTreeMap<String, Vec<String>>,
}

const SIMPLE_CLASSES: &[&str] = &[
	"java.lang.String",
	"java.lang.Long",
	"java.lang.Integer",
	"java.lang.Double",
	"java.lang.Float",
	"java.lang.Boolean",
];

impl Default for TypeTable {
	fn default() -> Self {
		let table = Self {
			classes: BTreeMap::new(),
		};
		SIMPLE_CLASSES
			.iter()
			.fold(table, |t, class| t.with_class(class, &["value"]))
			.with_class("uk.gov.gchq.gaffer.types.TypeValue", &["type", "value"])
			.with_class(
				"uk.gov.gchq.gaffer.types.TypeSubTypeValue",
				&["type", "subType", "value"],
			)
	}
}

impl TypeTable {
	/// Declares (or replaces) the fields of a value class.
	pub fn with_class(mut self, class: &str, fields: &[&str]) -> Self {
		self.classes.insert(
			class.to_owned(),
			fields.iter().map(|f| f.to_string()).collect(),
		);
		self
	}

	/// Fields declared for a value class.
	pub fn fields(&self, class: &str) -> &[String] {
		self.classes.get(class).map(Vec::as_slice).unwrap_or(&[])
	}

	/// Decomposes `vertex` into the parts declared for `class`.
	///
	/// Structured values may arrive wrapped as `{class: inner}`; the wrapper is skipped.
	pub fn parts(&self, class: &str, vertex: &Vertex) -> Parts {
		decompose(self.fields(class), unwrap(vertex))
	}
}

fn unwrap(vertex: &Vertex) -> &Vertex {
	match vertex {
		Value::Object(map) if map.len() == 1 => map.values().next().unwrap_or(vertex),
		_ => vertex,
	}
}

fn decompose(fields: &[String], value: &Value) -> Parts {
	match value {
		Value::Object(map) if fields.is_empty() => {
			map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
		}
		Value::Object(map) => fields
			.iter()
			.filter_map(|f| map.get(f).map(|v| (f.clone(), v.clone())))
			.collect(),
		Value::Array(_) => Parts::default(),
		primitive => match fields {
			[field] => Parts(vec![(field.clone(), primitive.clone())]),
			_ => Parts::default(),
		},
	}
}

impl ShortForm for TypeTable {
	fn short_form(&self, vertex: &Vertex) -> Option<String> {
		let fields: &[String] = match vertex {
			Value::Object(map) if map.len() == 1 => {
				map.keys().next().map(|class| self.fields(class)).unwrap_or(&[])
			}
			_ => &[],
		};
		let parts = decompose(fields, unwrap(vertex));
		if parts.is_empty() {
			return None;
		}
		Some(parts.iter().map(|(_, v)| part_text(v)).collect::<Vec<_>>().join("|"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::testing::sample_schema;
	use serde_json::json;

	#[test]
	fn resolves_entity_and_edge_groups() {
		let schema = sample_schema();
		let t = schema.vertex_type_for_entity_group("BasicEntity").unwrap();
		assert_eq!(t.name, "vertex");
		assert_eq!(t.class, "java.lang.String");

		let ends = schema.vertex_types_for_edge_group("foobarEdge").unwrap();
		assert_eq!(ends.source.name, "vertex");
		assert_eq!(ends.destination.name, "vertex");
	}

	#[test]
	fn unknown_groups_are_errors() {
		let schema = sample_schema();
		assert!(matches!(
			schema.vertex_type_for_entity_group("missing"),
			Err(GraphError::UnknownEntityGroup(g)) if g == "missing"
		));
		assert!(matches!(
			schema.vertex_types_for_edge_group("missing"),
			Err(GraphError::UnknownEdgeGroup(_))
		));
	}

	#[test]
	fn seed_class_comes_from_first_vertex_type() {
		let schema = sample_schema();
		assert_eq!(schema.vertex_type_names()[0], "vertex");
		assert_eq!(schema.seed_value_class().unwrap(), "java.lang.String");
		assert!(Schema::default().seed_value_class().is_err());
	}

	#[test]
	fn simple_classes_have_a_single_value_part() {
		let parts = TypeTable::default().parts("java.lang.String", &json!("foo"));
		assert_eq!(parts.get("value"), Some(&json!("foo")));
	}

	#[test]
	fn structured_parts_follow_declared_order() {
		let v = json!({"uk.gov.gchq.gaffer.types.TypeSubTypeValue": {
			"value": "v", "subType": "s", "type": "t"
		}});
		let parts = TypeTable::default().parts("uk.gov.gchq.gaffer.types.TypeSubTypeValue", &v);
		let fields: Vec<_> = parts.iter().map(|(k, _)| k).collect();
		assert_eq!(fields, ["type", "subType", "value"]);
		assert_eq!(
			serde_json::to_value(&parts).unwrap(),
			json!({"type": "t", "subType": "s", "value": "v"})
		);
	}

	#[test]
	fn short_form_joins_parts() {
		let table = TypeTable::default();
		let v = json!({"uk.gov.gchq.gaffer.types.TypeValue": {"type": "t1", "value": "v1"}});
		assert_eq!(table.short_form(&v).as_deref(), Some("t1|v1"));
		assert_eq!(table.short_form(&json!([1, 2])), None);
	}
}
