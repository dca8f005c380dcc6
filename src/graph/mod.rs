//! Result-graph engine: identity, classification, merging, selection sync and the
//! controller that drives a view. Independent of any particular rendering surface.

mod classify;
mod controller;
mod merge;
mod query;
mod records;
mod schema;
mod selection;
mod surface;
mod tap;
mod vertex;

#[cfg(test)]
pub(crate) mod testing;

pub use classify::{ClassSet, Classifier, EdgeClasses, StyleClass, StyleRule, stylesheet};
pub use controller::{GraphController, GraphControllerBuilder, Phase, ResultEvent};
pub use merge::{GraphState, MergeSummary, Merger};
pub use query::{
	EntitySeed, InputTerm, Operation, OperationChain, OperationChainBuilder, Options,
	QueryBuilder, QueryTicket, quick_hop,
};
pub use records::{EDGE_ID_SEPARATOR, EdgeRecord, EntityRecord, ResultBatch, edge_id, is_edge_id};
pub use schema::{
	EdgeDefinition, EdgeVertexTypes, EntityDefinition, Parts, Schema, TypeDefinition,
	TypeDescriptor, TypeTable, part_text,
};
pub use selection::{Selected, SelectionContext, SelectionModel, SelectionSync};
pub use surface::{
	ElementData, ElementSpec, PLACEHOLDER_POSITION, RenderSurface, SurfaceEvent, Transaction,
};
pub use tap::{DOUBLE_TAP_WINDOW_MS, TapDisambiguator, TapOutcome, TapState};
pub use vertex::{ElementId, ShortForm, Vertex, identify, literal, parse_id, short_label};
