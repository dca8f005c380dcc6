//! Incorporates result batches into the rendering surface.
//!
//! A merge first stages every add and class merge in a [`Transaction`], deduplicating
//! vertices against the surface and against the batch itself, and only then commits
//! the transaction in one call. Classification failures abort the batch before
//! anything reaches the surface.

use std::collections::HashMap;

use log::debug;

use super::classify::{ClassSet, Classifier};
use super::records::{EdgeRecord, EntityRecord, ResultBatch, edge_id};
use super::selection::SelectionModel;
use super::surface::{ElementData, ElementSpec, PLACEHOLDER_POSITION, RenderSurface, Transaction};
use super::vertex::{ElementId, ShortForm, Vertex, identify, short_label};
use crate::error::Result;

/// Records backing every element currently on the surface.
///
/// Every vertex node has an entry in `entities`; vertices that only appear as edge
/// endpoints map to an empty list.
#[derive(Clone, Debug, Default)]
pub struct GraphState {
	entities: HashMap<ElementId, Vec<EntityRecord>>,
	edges: HashMap<ElementId, Vec<EdgeRecord>>,
}

impl GraphState {
	/// Entity records behind a vertex.
	pub fn entities(&self, id: &str) -> Option<&[EntityRecord]> {
		self.entities.get(id).map(Vec::as_slice)
	}

	/// Edge records behind an edge.
	pub fn edges(&self, id: &str) -> Option<&[EdgeRecord]> {
		self.edges.get(id).map(Vec::as_slice)
	}

	/// Whether the id is tracked.
	pub fn contains(&self, id: &str) -> bool {
		self.entities.contains_key(id) || self.edges.contains_key(id)
	}

	/// Number of tracked elements, vertices and edges together.
	pub fn len(&self) -> usize {
		self.entities.len() + self.edges.len()
	}

	/// Whether nothing is tracked.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Tracked vertex ids.
	pub fn vertex_ids(&self) -> impl Iterator<Item = &ElementId> {
		self.entities.keys()
	}

	/// Tracked edge ids.
	pub fn edge_ids(&self) -> impl Iterator<Item = &ElementId> {
		self.edges.keys()
	}

	/// Forgets an element that left the surface. Unknown ids are ignored.
	pub fn remove(&mut self, id: &str) -> bool {
		self.entities.remove(id).is_some() | self.edges.remove(id).is_some()
	}

	/// Forgets everything.
	pub fn clear(&mut self) {
		self.entities.clear();
		self.edges.clear();
	}

	fn track_vertex(&mut self, id: &str) -> &mut Vec<EntityRecord> {
		self.entities.entry(id.to_owned()).or_default()
	}

	fn record_entity(&mut self, id: &str, record: &EntityRecord) {
		let records = self.track_vertex(id);
		if !records.contains(record) {
			records.push(record.clone());
		}
	}

	fn record_edge(&mut self, id: &str, record: &EdgeRecord) {
		let records = self.edges.entry(id.to_owned()).or_default();
		if !records.contains(record) {
			records.push(record.clone());
		}
	}
}

/// What a merge changed on the surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeSummary {
	/// Elements added.
	pub added: usize,
	/// Live elements that received classes.
	pub merged: usize,
}

/// Stages and commits one result batch.
pub struct Merger<'a> {
	classifier: Classifier<'a>,
	labels: &'a dyn ShortForm,
	selection: &'a SelectionModel,
}

impl<'a> Merger<'a> {
	/// Labels come from `labels`; initial selected flags from `selection`.
	pub fn new(
		classifier: Classifier<'a>,
		labels: &'a dyn ShortForm,
		selection: &'a SelectionModel,
	) -> Self {
		Self {
			classifier,
			labels,
			selection,
		}
	}

	/// Merges `batch` into `surface` and `graph` as one transaction.
	pub fn merge<S: RenderSurface + ?Sized>(
		&self,
		batch: &ResultBatch,
		graph: &mut GraphState,
		surface: &mut S,
	) -> Result<MergeSummary> {
		let transaction = self.stage(batch, surface)?;
		let summary = MergeSummary {
			added: transaction.adds().len(),
			merged: transaction.merges().len(),
		};
		surface.commit(transaction);

		for entity in &batch.entities {
			graph.record_entity(&entity.id(), entity);
		}
		for edge in &batch.edges {
			let (source, destination) = (identify(&edge.source), identify(&edge.destination));
			graph.track_vertex(&source);
			graph.track_vertex(&destination);
			graph.record_edge(
				&edge_id(&source, &destination, edge.directed, &edge.group),
				edge,
			);
		}

		debug!(
			"Merged {} entities and {} edges: {} elements added, {} class merges",
			batch.entities.len(),
			batch.edges.len(),
			summary.added,
			summary.merged
		);
		Ok(summary)
	}

	/// Builds the transaction for `batch` without touching the surface.
	pub fn stage<S: RenderSurface + ?Sized>(
		&self,
		batch: &ResultBatch,
		surface: &S,
	) -> Result<Transaction> {
		let mut tx = Transaction::new();

		for entity in &batch.entities {
			let classes = self.classifier.classes_for_entity(entity)?;
			self.stage_vertex(&mut tx, surface, &entity.vertex, &entity.id(), &classes);
		}

		for edge in &batch.edges {
			let classes = self.classifier.classes_for_edge(edge)?;
			let (source, destination) = (identify(&edge.source), identify(&edge.destination));
			let id = edge_id(&source, &destination, edge.directed, &edge.group);

			self.stage_vertex(&mut tx, surface, &edge.source, &source, &classes.source);
			self.stage_vertex(
				&mut tx,
				surface,
				&edge.destination,
				&destination,
				&classes.destination,
			);

			if !surface.contains(&id) && tx.staged(&id).is_none() {
				let selected = self.selection.has_edge(&id);
				tx.stage(ElementSpec {
					id,
					data: ElementData::Edge {
						source,
						target: destination,
						group: edge.group.clone(),
					},
					classes: classes.edge,
					selected,
				});
			}
		}
		Ok(tx)
	}

	fn stage_vertex<S: RenderSurface + ?Sized>(
		&self,
		tx: &mut Transaction,
		surface: &S,
		vertex: &Vertex,
		id: &str,
		classes: &ClassSet,
	) {
		if surface.contains(id) {
			tx.merge_live(id, classes);
		} else if let Some(staged) = tx.staged_mut(id) {
			staged.classes.merge(classes);
		} else {
			tx.stage(ElementSpec {
				id: id.to_owned(),
				data: ElementData::Node {
					label: short_label(vertex, self.labels),
					position: PLACEHOLDER_POSITION,
				},
				classes: classes.clone(),
				selected: self.selection.has_entity(id),
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::force_graph::ForceGraphState;
	use crate::error::GraphError;
	use crate::graph::classify::StyleClass;
	use crate::graph::schema::TypeTable;
	use crate::graph::testing::{batch, edge, entity, sample_schema};
	use serde_json::json;

	struct Fixture {
		schema: crate::graph::schema::Schema,
		types: TypeTable,
		selection: SelectionModel,
		graph: GraphState,
		surface: ForceGraphState,
	}

	impl Fixture {
		fn new() -> Self {
			Self {
				schema: sample_schema(),
				types: TypeTable::default(),
				selection: SelectionModel::default(),
				graph: GraphState::default(),
				surface: ForceGraphState::new(800.0, 600.0),
			}
		}

		fn merge(&mut self, batch: &ResultBatch) -> Result<MergeSummary> {
			let classifier = Classifier::new(&self.schema, &self.types);
			Merger::new(classifier, &self.types, &self.selection).merge(
				batch,
				&mut self.graph,
				&mut self.surface,
			)
		}
	}

	#[test]
	fn shared_endpoint_is_added_once() {
		let mut f = Fixture::new();
		let summary = f
			.merge(&batch(vec![entity("foo")], vec![edge("foo", "bar")]))
			.unwrap();
		assert_eq!(summary.added, 3);
		assert_eq!(f.surface.len(), 3);
		assert!(f.surface.contains("\"foo\""));
		assert!(f.surface.contains("\"bar\""));
		assert!(f.surface.contains("\"foo\"\0\"bar\"\0true\0foobarEdge"));
		assert_eq!(f.graph.len(), f.surface.len());
	}

	#[test]
	fn classes_of_duplicates_within_a_batch_are_unioned() {
		let mut f = Fixture::new();
		f.merge(&batch(vec![entity("foo")], vec![edge("foo", "bar")]))
			.unwrap();
		assert!(f.surface.has_class("\"foo\"", &StyleClass::EntityWrapper));
		assert!(f.surface.has_class("\"foo\"", &StyleClass::DefaultVertex));
		assert!(!f.surface.has_class("\"bar\"", &StyleClass::EntityWrapper));
	}

	#[test]
	fn existing_elements_get_classes_merged_not_re_added() {
		let mut f = Fixture::new();
		f.merge(&batch(vec![], vec![edge("foo", "bar")])).unwrap();
		assert!(!f.surface.has_class("\"foo\"", &StyleClass::EntityWrapper));

		let summary = f.merge(&batch(vec![entity("foo")], vec![])).unwrap();
		assert_eq!(summary, MergeSummary { added: 0, merged: 1 });
		assert!(f.surface.has_class("\"foo\"", &StyleClass::EntityWrapper));
		assert_eq!(f.surface.len(), 3);
		assert_eq!(f.graph.entities("\"foo\"").map(<[_]>::len), Some(1));
		assert_eq!(f.graph.entities("\"bar\"").map(<[_]>::len), Some(0));
	}

	#[test]
	fn merging_twice_is_idempotent() {
		let mut f = Fixture::new();
		let b = batch(vec![entity("foo")], vec![edge("foo", "bar")]);
		f.merge(&b).unwrap();
		f.merge(&b).unwrap();
		assert_eq!(f.surface.len(), 3);
		assert_eq!(f.graph.len(), 3);
		assert_eq!(f.graph.entities("\"foo\"").map(<[_]>::len), Some(1));
		let edge_id = edge("foo", "bar").id();
		assert_eq!(f.graph.edges(&edge_id).map(<[_]>::len), Some(1));
	}

	#[test]
	fn numeric_and_string_vertices_are_distinct() {
		let mut f = Fixture::new();
		let mut numeric = entity("ignored");
		numeric.vertex = json!(1);
		f.merge(&batch(vec![numeric, entity("1")], vec![])).unwrap();
		assert!(f.surface.contains("1"));
		assert!(f.surface.contains("\"1\""));
		assert_eq!(f.surface.len(), 2);
	}

	#[test]
	fn unknown_group_aborts_the_whole_batch() {
		let mut f = Fixture::new();
		let mut bad = edge("x", "y");
		bad.group = "nope".into();
		let result = f.merge(&batch(vec![entity("foo")], vec![bad]));
		assert!(matches!(result, Err(GraphError::UnknownEdgeGroup(_))));
		assert!(f.surface.is_empty());
		assert!(f.graph.is_empty());
	}

	#[test]
	fn staged_elements_inherit_selection() {
		let mut f = Fixture::new();
		f.selection.select_entities("\"foo\"", vec![entity("foo")]);
		let classifier = Classifier::new(&f.schema, &f.types);
		let tx = Merger::new(classifier, &f.types, &f.selection)
			.stage(&batch(vec![entity("foo"), entity("bar")], vec![]), &f.surface)
			.unwrap();
		assert!(tx.staged("\"foo\"").unwrap().selected);
		assert!(!tx.staged("\"bar\"").unwrap().selected);
	}

	#[test]
	fn staged_edges_inherit_selection() {
		let mut f = Fixture::new();
		let (chosen, other) = (edge("foo", "bar"), edge("bar", "baz"));
		f.selection.select_edges(&chosen.id(), vec![chosen.clone()]);
		let classifier = Classifier::new(&f.schema, &f.types);
		let tx = Merger::new(classifier, &f.types, &f.selection)
			.stage(&batch(vec![], vec![chosen.clone(), other.clone()]), &f.surface)
			.unwrap();
		assert!(tx.staged(&chosen.id()).unwrap().selected);
		assert!(!tx.staged(&other.id()).unwrap().selected);
		assert!(!tx.staged("\"foo\"").unwrap().selected);
	}

	#[test]
	fn removal_keeps_graph_and_surface_in_step() {
		let mut f = Fixture::new();
		f.merge(&batch(vec![entity("foo")], vec![edge("foo", "bar")]))
			.unwrap();
		f.surface.remove(&["\"bar\"".to_owned()]);
		for event in f.surface.take_events() {
			if let crate::graph::surface::SurfaceEvent::Removed(id) = event {
				f.graph.remove(&id);
			}
		}
		// the edge went with its endpoint
		assert_eq!(f.surface.len(), 1);
		assert_eq!(f.graph.len(), 1);
		assert!(!f.graph.remove("\"missing\""));
	}
}
