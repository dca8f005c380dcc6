//! Result records as streamed in from the query service.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::vertex::{ElementId, Vertex, identify};

/// Separates the components of an edge id. Never produced by vertex serialization,
/// which escapes control characters.
pub const EDGE_ID_SEPARATOR: char = '\0';

/// One occurrence of a graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
	/// Entity group.
	#[serde(default)]
	pub group: String,
	/// The vertex this entity describes.
	pub vertex: Vertex,
	/// Entity properties.
	#[serde(default)]
	pub properties: Map<String, Value>,
}

impl EntityRecord {
	/// A record carrying only a vertex, used for bare vertices with no entity data.
	pub fn bare(vertex: Vertex) -> Self {
		Self {
			group: String::new(),
			vertex,
			properties: Map::new(),
		}
	}

	/// Element id of the vertex.
	pub fn id(&self) -> ElementId {
		identify(&self.vertex)
	}
}

/// One occurrence of a relation between two vertices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
	/// Edge group.
	pub group: String,
	/// Source vertex.
	pub source: Vertex,
	/// Destination vertex.
	pub destination: Vertex,
	/// Whether the edge has a direction.
	#[serde(default)]
	pub directed: bool,
	/// Edge properties.
	#[serde(default)]
	pub properties: Map<String, Value>,
}

impl EdgeRecord {
	/// Element id of the edge.
	pub fn id(&self) -> ElementId {
		edge_id(
			&identify(&self.source),
			&identify(&self.destination),
			self.directed,
			&self.group,
		)
	}
}

/// Builds an edge id from its already-identified endpoints.
pub fn edge_id(source: &str, destination: &str, directed: bool, group: &str) -> ElementId {
	let sep = EDGE_ID_SEPARATOR;
	format!("{source}{sep}{destination}{sep}{directed}{sep}{group}")
}

/// Whether an element id belongs to the edge id-space.
pub fn is_edge_id(id: &str) -> bool {
	id.contains(EDGE_ID_SEPARATOR)
}

/// A batch of results, in no particular order and possibly with duplicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBatch {
	/// Entity records.
	#[serde(default)]
	pub entities: Vec<EntityRecord>,
	/// Edge records.
	#[serde(default)]
	pub edges: Vec<EdgeRecord>,
}

impl ResultBatch {
	/// Whether the batch holds no records.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.edges.is_empty()
	}

	/// Appends another batch, as the result store does when new results arrive.
	pub fn extend(&mut self, other: ResultBatch) {
		self.entities.extend(other.entities);
		self.edges.extend(other.edges);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn edge_id_joins_components() {
		let record = EdgeRecord {
			group: "foobarEdge".into(),
			source: json!("foo"),
			destination: json!("bar"),
			directed: true,
			properties: Map::new(),
		};
		assert_eq!(record.id(), "\"foo\"\0\"bar\"\0true\0foobarEdge");
		assert!(is_edge_id(&record.id()));
	}

	#[test]
	fn vertex_ids_never_contain_the_separator() {
		let v = json!({"weird": "a\u{0}b"});
		assert!(!is_edge_id(&identify(&v)));
		assert!(!is_edge_id(&identify(&json!("\u{0}"))));
	}

	#[test]
	fn records_deserialize_with_defaults() {
		let batch: ResultBatch = serde_json::from_value(json!({
			"entities": [{"group": "BasicEntity", "vertex": "foo"}],
			"edges": [{
				"group": "foobarEdge",
				"source": "foo",
				"destination": "bar",
				"directed": true
			}]
		}))
		.unwrap();
		assert_eq!(batch.entities[0].id(), "\"foo\"");
		assert!(batch.entities[0].properties.is_empty());
		assert!(batch.edges[0].directed);
	}
}
