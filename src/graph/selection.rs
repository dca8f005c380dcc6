//! Selection model and its synchronisation with surface events and the query builder.

use std::collections::BTreeMap;

use log::debug;

use super::merge::GraphState;
use super::query::{InputTerm, QueryBuilder};
use super::records::{EdgeRecord, EntityRecord};
use super::schema::{Schema, TypeTable};
use super::vertex::{ElementId, parse_id};
use crate::error::Result;

/// Records behind the currently selected elements, keyed by element id.
///
/// Every id held here is a selected element on the surface; the synchroniser removes
/// ids in the same step the surface unselects or removes them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionModel {
	entities: BTreeMap<ElementId, Vec<EntityRecord>>,
	edges: BTreeMap<ElementId, Vec<EdgeRecord>>,
	revision: u64,
}

impl SelectionModel {
	/// Whether the vertex is selected.
	pub fn has_entity(&self, id: &str) -> bool {
		self.entities.contains_key(id)
	}

	/// Whether the edge is selected.
	pub fn has_edge(&self, id: &str) -> bool {
		self.edges.contains_key(id)
	}

	/// Selected vertices and their entity records.
	pub fn entities(&self) -> &BTreeMap<ElementId, Vec<EntityRecord>> {
		&self.entities
	}

	/// Selected edges and their records.
	pub fn edges(&self) -> &BTreeMap<ElementId, Vec<EdgeRecord>> {
		&self.edges
	}

	/// Ids of the selected vertices.
	pub fn entity_ids(&self) -> Vec<ElementId> {
		self.entities.keys().cloned().collect()
	}

	/// Whether nothing is selected.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.edges.is_empty()
	}

	/// Bumped on every change so views know when to refresh.
	pub fn revision(&self) -> u64 {
		self.revision
	}

	/// Records a selected vertex.
	pub fn select_entities(&mut self, id: &str, records: Vec<EntityRecord>) {
		self.entities.insert(id.to_owned(), records);
		self.revision += 1;
	}

	/// Records a selected edge.
	pub fn select_edges(&mut self, id: &str, records: Vec<EdgeRecord>) {
		self.edges.insert(id.to_owned(), records);
		self.revision += 1;
	}

	/// Forgets a selected vertex, returning its records.
	pub fn unselect_entity(&mut self, id: &str) -> Option<Vec<EntityRecord>> {
		let removed = self.entities.remove(id);
		if removed.is_some() {
			self.revision += 1;
		}
		removed
	}

	/// Forgets a selected edge, returning its records.
	pub fn unselect_edge(&mut self, id: &str) -> Option<Vec<EdgeRecord>> {
		let removed = self.edges.remove(id);
		if removed.is_some() {
			self.revision += 1;
		}
		removed
	}

	/// Forgets everything.
	pub fn clear(&mut self) {
		if !self.is_empty() {
			self.entities.clear();
			self.edges.clear();
			self.revision += 1;
		}
	}
}

/// What a select event resolved to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selected {
	/// A vertex with entity records.
	Entity,
	/// An edge.
	Edge,
	/// A vertex with no entity records behind it.
	Vertex,
}

/// Read-only lookups the synchroniser needs.
#[derive(Clone, Copy)]
pub struct SelectionContext<'a> {
	/// Records behind the surface.
	pub graph: &'a GraphState,
	/// Schema for value classes.
	pub schema: &'a Schema,
	/// Type table for parts.
	pub types: &'a TypeTable,
}

/// Mirrors entity selection into the query builder's input set.
///
/// The input term registered for an id is remembered so the exact same term is
/// removed again when the id is unselected.
#[derive(Clone, Debug, Default)]
pub struct SelectionSync {
	inputs: BTreeMap<ElementId, InputTerm>,
}

impl SelectionSync {
	/// Records a newly selected element and registers its input term.
	pub fn on_select(
		&mut self,
		id: &str,
		ctx: SelectionContext<'_>,
		selection: &mut SelectionModel,
		query: &mut dyn QueryBuilder,
	) -> Result<Selected> {
		let (records, kind) = match ctx.graph.entities(id) {
			Some(records) if !records.is_empty() => (records.to_vec(), Selected::Entity),
			_ => {
				if let Some(edges) = ctx.graph.edges(id) {
					selection.select_edges(id, edges.to_vec());
					debug!("Selected edge {id:?}");
					return Ok(Selected::Edge);
				}
				(vec![EntityRecord::bare(parse_id(id))], Selected::Vertex)
			}
		};

		let term = input_term(id, &records, ctx)?;
		selection.select_entities(id, records);
		if let Some(previous) = self.inputs.insert(id.to_owned(), term.clone()) {
			query.remove_input(&previous);
		}
		query.add_input(term);
		debug!("Selected {kind:?} {id:?}");
		Ok(kind)
	}

	/// Forgets an element and removes the input term registered for it.
	pub fn on_unselect(
		&mut self,
		id: &str,
		selection: &mut SelectionModel,
		query: &mut dyn QueryBuilder,
	) {
		if selection.unselect_entity(id).is_some() {
			if let Some(term) = self.inputs.remove(id) {
				query.remove_input(&term);
			}
			debug!("Unselected entity {id:?}");
		} else if selection.unselect_edge(id).is_some() {
			debug!("Unselected edge {id:?}");
		}
	}

	/// Drops every remembered input, withdrawing each from the query builder.
	pub fn clear(&mut self, query: &mut dyn QueryBuilder) {
		for term in std::mem::take(&mut self.inputs).values() {
			query.remove_input(term);
		}
	}
}

/// Query-builder input for a selected vertex: the value class of its entity group
/// (or the schema's seed class for bare vertices) plus its parts.
fn input_term(id: &str, records: &[EntityRecord], ctx: SelectionContext<'_>) -> Result<InputTerm> {
	let class = match records
		.iter()
		.find_map(|r| ctx.schema.vertex_type_for_entity_group(&r.group).ok())
	{
		Some(descriptor) => descriptor.class,
		None => ctx.schema.seed_value_class()?,
	};
	let parts = ctx.types.parts(&class, &parse_id(id));
	Ok(InputTerm {
		value_class: class,
		parts,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::query::OperationChainBuilder;
	use crate::graph::testing::{batch, edge, entity, merged, sample_schema};
	use serde_json::json;

	struct Fixture {
		graph: GraphState,
		schema: Schema,
		types: TypeTable,
		selection: SelectionModel,
		sync: SelectionSync,
		query: OperationChainBuilder,
	}

	impl Fixture {
		fn new() -> Self {
			let schema = sample_schema();
			let types = TypeTable::default();
			let graph = merged(
				&schema,
				&types,
				&batch(vec![entity("foo")], vec![edge("foo", "bar")]),
			);
			Self {
				graph,
				schema,
				types,
				selection: SelectionModel::default(),
				sync: SelectionSync::default(),
				query: OperationChainBuilder::default(),
			}
		}

		fn select(&mut self, id: &str) -> Selected {
			let ctx = SelectionContext {
				graph: &self.graph,
				schema: &self.schema,
				types: &self.types,
			};
			self.sync
				.on_select(id, ctx, &mut self.selection, &mut self.query)
				.unwrap()
		}

		fn unselect(&mut self, id: &str) {
			self.sync
				.on_unselect(id, &mut self.selection, &mut self.query);
		}
	}

	#[test]
	fn entity_selection_feeds_the_query_builder() {
		let mut f = Fixture::new();
		assert_eq!(f.select("\"foo\""), Selected::Entity);
		assert_eq!(f.selection.entities()["\"foo\""], vec![entity("foo")]);
		assert_eq!(f.query.inputs().len(), 1);
		let input = serde_json::to_value(&f.query.inputs()[0]).unwrap();
		assert_eq!(
			input,
			json!({"valueClass": "java.lang.String", "parts": {"value": "foo"}})
		);
	}

	#[test]
	fn edge_selection_skips_the_query_builder() {
		let mut f = Fixture::new();
		let id = edge("foo", "bar").id();
		assert_eq!(f.select(&id), Selected::Edge);
		assert!(f.selection.has_edge(&id));
		assert!(f.query.inputs().is_empty());

		f.unselect(&id);
		assert!(f.selection.is_empty());
	}

	#[test]
	fn bare_vertices_are_synthesised() {
		let mut f = Fixture::new();
		assert_eq!(f.select("\"bar\""), Selected::Vertex);
		assert_eq!(
			f.selection.entities()["\"bar\""],
			vec![EntityRecord::bare(json!("bar"))]
		);
		assert_eq!(f.query.inputs().len(), 1);

		assert_eq!(f.select("\"unknown\""), Selected::Vertex);
		assert_eq!(f.query.inputs().len(), 2);
	}

	#[test]
	fn select_then_unselect_round_trips() {
		let mut f = Fixture::new();
		let (before_selection, before_inputs) =
			(f.selection.entities().clone(), f.query.inputs().to_vec());
		f.select("\"foo\"");
		f.unselect("\"foo\"");
		assert_eq!(f.selection.entities(), &before_selection);
		assert_eq!(f.query.inputs(), before_inputs.as_slice());
	}

	#[test]
	fn unselecting_unknown_ids_is_a_no_op() {
		let mut f = Fixture::new();
		let revision = f.selection.revision();
		f.unselect("\"nothing\"");
		assert_eq!(f.selection.revision(), revision);
	}

	#[test]
	fn clear_withdraws_every_input() {
		let mut f = Fixture::new();
		f.select("\"foo\"");
		f.select("\"bar\"");
		f.sync.clear(&mut f.query);
		assert!(f.query.inputs().is_empty());
	}
}
