//! Error type shared by the graph engine and its components.

use thiserror::Error;

/// Message shown when a quick hop is requested without any seed vertices.
pub const EMPTY_QUICK_HOP: &str = "Please select one or more vertices first";

/// Errors raised while building, classifying or driving the result graph.
#[derive(Error, Debug)]
pub enum GraphError {
	/// The view was built without a selection model.
	#[error("Graph view must have a selection model injected into it")]
	MissingSelectionModel,

	/// The schema has no entity group of this name.
	#[error("No vertex type declared for entity group '{0}'")]
	UnknownEntityGroup(String),

	/// The schema has no edge group of this name.
	#[error("No vertex types declared for edge group '{0}'")]
	UnknownEdgeGroup(String),

	/// The schema has no type of this name.
	#[error("Unknown type '{0}'")]
	UnknownType(String),

	/// A quick hop had no seed vertices.
	#[error("{EMPTY_QUICK_HOP}")]
	EmptyQuickHop,

	/// The configuration document did not parse.
	#[error("Invalid graph configuration: {0}")]
	Config(#[from] serde_json::Error),

	/// The query service rejected or failed a chain.
	#[error("Query execution failed: {0}")]
	Query(String),

	/// The view was used after teardown.
	#[error("Graph view has been torn down")]
	Destroyed,
}

impl GraphError {
	/// Whether the error is a user-facing validation message rather than a fault.
	pub fn is_validation(&self) -> bool {
		matches!(self, GraphError::EmptyQuickHop)
	}
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
