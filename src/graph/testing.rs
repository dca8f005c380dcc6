//! Fixtures shared by the engine's tests.

use serde_json::{Map, json};

use super::classify::Classifier;
use super::merge::{GraphState, Merger};
use super::records::{EdgeRecord, EntityRecord, ResultBatch};
use super::schema::{Schema, TypeTable};
use super::selection::SelectionModel;
use crate::components::force_graph::ForceGraphState;

/// One string-typed vertex type used by a `BasicEntity` entity group and a
/// `foobarEdge` edge group.
pub(crate) fn sample_schema() -> Schema {
	serde_json::from_value(json!({
		"types": {"vertex": {"class": "java.lang.String"}},
		"entities": {"BasicEntity": {"vertex": "vertex"}},
		"edges": {"foobarEdge": {"source": "vertex", "destination": "vertex"}}
	}))
	.unwrap()
}

pub(crate) fn entity(vertex: &str) -> EntityRecord {
	EntityRecord {
		group: "BasicEntity".into(),
		vertex: json!(vertex),
		properties: Map::new(),
	}
}

pub(crate) fn edge(source: &str, destination: &str) -> EdgeRecord {
	EdgeRecord {
		group: "foobarEdge".into(),
		source: json!(source),
		destination: json!(destination),
		directed: true,
		properties: Map::new(),
	}
}

pub(crate) fn batch(entities: Vec<EntityRecord>, edges: Vec<EdgeRecord>) -> ResultBatch {
	ResultBatch { entities, edges }
}

/// Graph state after merging `batch` into an empty canvas.
pub(crate) fn merged(schema: &Schema, types: &TypeTable, batch: &ResultBatch) -> GraphState {
	let selection = SelectionModel::default();
	let mut graph = GraphState::default();
	let mut surface = ForceGraphState::new(800.0, 600.0);
	Merger::new(Classifier::new(schema, types), types, &selection)
		.merge(batch, &mut graph, &mut surface)
		.unwrap();
	graph
}
