//! Query-builder interface and the operations the graph view issues.
//!
//! Operations serialise to the JSON shape the query service expects, with a fully
//! qualified `class` discriminator on every operation and seed.

use std::collections::BTreeMap;

use serde::Serialize;

use super::schema::Parts;
use super::vertex::{ElementId, Vertex, parse_id};
use crate::config::OperationSettings;
use crate::error::{GraphError, Result};

/// Class of the get-elements operation.
pub const GET_ELEMENTS: &str = "uk.gov.gchq.gaffer.operation.impl.get.GetElements";
/// Class of the limit operation.
pub const LIMIT: &str = "uk.gov.gchq.gaffer.operation.impl.Limit";
/// Class of the deduplicating to-set operation.
pub const TO_SET: &str = "uk.gov.gchq.gaffer.operation.impl.output.ToSet";
/// Class of an operation chain.
pub const OPERATION_CHAIN: &str = "uk.gov.gchq.gaffer.operation.OperationChain";
/// Class of an entity seed.
pub const ENTITY_SEED: &str = "uk.gov.gchq.gaffer.operation.data.EntitySeed";

/// A typed seed registered with the query builder.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputTerm {
	/// Value class of the seed vertex.
	pub value_class: String,
	/// The vertex broken into named parts.
	pub parts: Parts,
}

/// A vertex to start an operation from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySeed {
	/// Always [`ENTITY_SEED`].
	pub class: String,
	/// Seed vertex value.
	pub vertex: Vertex,
}

impl EntitySeed {
	/// A seed for `vertex`.
	pub fn new(vertex: Vertex) -> Self {
		Self {
			class: ENTITY_SEED.into(),
			vertex,
		}
	}
}

/// View filter applied to every group.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalElements {
	/// Properties to group by; empty for no grouping.
	pub group_by: Vec<String>,
}

/// Element view of a get operation.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
	/// Filters applied to every group.
	pub global_elements: Vec<GlobalElements>,
}

/// Operation options, passed through verbatim.
pub type Options = BTreeMap<String, String>;

/// An operation in a chain.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "class")]
pub enum Operation {
	/// Fetches elements adjacent to the seeds.
	#[serde(rename = "uk.gov.gchq.gaffer.operation.impl.get.GetElements")]
	GetElements {
		/// Seeds.
		input: Vec<EntitySeed>,
		/// Operation options.
		options: Options,
		/// Element view.
		view: View,
	},
	/// Caps the number of results.
	#[serde(rename = "uk.gov.gchq.gaffer.operation.impl.Limit", rename_all = "camelCase")]
	Limit {
		/// Maximum result count.
		result_limit: usize,
		/// Drop the excess instead of failing.
		truncate: bool,
		/// Operation options.
		options: Options,
	},
	/// Deduplicates by collecting into a set.
	#[serde(rename = "uk.gov.gchq.gaffer.operation.impl.output.ToSet")]
	Deduplicate {
		/// Operation options.
		options: Options,
	},
}

impl Operation {
	/// One hop out from `seeds`, with no grouping.
	pub fn get_elements(seeds: &[ElementId], options: &Options) -> Self {
		Operation::GetElements {
			input: seeds.iter().map(|s| EntitySeed::new(parse_id(s))).collect(),
			options: options.clone(),
			view: View {
				global_elements: vec![GlobalElements::default()],
			},
		}
	}

	/// Limit to the configured result count.
	pub fn limit(settings: &OperationSettings, options: &Options) -> Self {
		Operation::Limit {
			result_limit: settings.result_limit,
			truncate: true,
			options: options.clone(),
		}
	}

	/// Deduplicating to-set step.
	pub fn deduplicate(options: &Options) -> Self {
		Operation::Deduplicate {
			options: options.clone(),
		}
	}
}

/// Operations executed in sequence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationChain {
	/// Always [`OPERATION_CHAIN`].
	pub class: String,
	/// Operations in order.
	pub operations: Vec<Operation>,
	/// Chain options.
	pub options: Options,
}

impl OperationChain {
	/// A chain of `operations`.
	pub fn new(operations: Vec<Operation>, options: Options) -> Self {
		Self {
			class: OPERATION_CHAIN.into(),
			operations,
			options,
		}
	}
}

/// Handle on a chain handed to the query service; completion is reported back with it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryTicket(pub u64);

/// The query-construction service.
pub trait QueryBuilder {
	/// Registers a seed input.
	fn add_input(&mut self, term: InputTerm);

	/// Drops a seed input.
	fn remove_input(&mut self, term: &InputTerm);

	/// Records an operation in the query history.
	fn add_operation(&mut self, operation: Operation);

	/// Starts executing a chain. The caller is told about completion separately.
	fn execute(&mut self, chain: OperationChain) -> Result<QueryTicket>;
}

/// Builds the quick-hop chain: a one-hop GetElements from `seeds`, limited and
/// deduplicated with the active options.
pub fn quick_hop(
	seeds: &[ElementId],
	settings: &OperationSettings,
) -> Result<(Operation, OperationChain)> {
	if seeds.is_empty() {
		return Err(GraphError::EmptyQuickHop);
	}
	let options = &settings.default_options;
	let get = Operation::get_elements(seeds, options);
	let chain = OperationChain::new(
		vec![
			get.clone(),
			Operation::limit(settings, options),
			Operation::deduplicate(options),
		],
		options.clone(),
	);
	Ok((get, chain))
}

/// In-memory query builder: keeps the input set, the operation history and the
/// chains waiting to be sent.
#[derive(Clone, Debug, Default)]
pub struct OperationChainBuilder {
	inputs: Vec<InputTerm>,
	history: Vec<Operation>,
	pending: Vec<(QueryTicket, OperationChain)>,
	next_ticket: u64,
}

impl OperationChainBuilder {
	/// Current input set.
	pub fn inputs(&self) -> &[InputTerm] {
		&self.inputs
	}

	/// Operations recorded so far.
	pub fn history(&self) -> &[Operation] {
		&self.history
	}

	/// Chains waiting to be sent.
	pub fn pending(&self) -> &[(QueryTicket, OperationChain)] {
		&self.pending
	}

	/// Hands the queued chains to whoever sends them.
	pub fn take_pending(&mut self) -> Vec<(QueryTicket, OperationChain)> {
		std::mem::take(&mut self.pending)
	}
}

impl QueryBuilder for OperationChainBuilder {
	fn add_input(&mut self, term: InputTerm) {
		if !self.inputs.contains(&term) {
			self.inputs.push(term);
		}
	}

	fn remove_input(&mut self, term: &InputTerm) {
		self.inputs.retain(|t| t != term);
	}

	fn add_operation(&mut self, operation: Operation) {
		self.history.push(operation);
	}

	fn execute(&mut self, chain: OperationChain) -> Result<QueryTicket> {
		let ticket = QueryTicket(self.next_ticket);
		self.next_ticket += 1;
		self.pending.push((ticket, chain));
		Ok(ticket)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn empty_seeds_are_rejected() {
		let err = quick_hop(&[], &OperationSettings::default()).unwrap_err();
		assert!(err.is_validation());
		assert_eq!(err.to_string(), "Please select one or more vertices first");
	}

	#[test]
	fn quick_hop_chain_shape() {
		let mut settings = OperationSettings::default();
		settings.result_limit = 50;
		settings
			.default_options
			.insert("gaffer.federatedstore.operation.graphIds".into(), "g1".into());
		let (_, chain) = quick_hop(&["\"foo\"".to_owned(), "2".to_owned()], &settings).unwrap();
		let options = json!({"gaffer.federatedstore.operation.graphIds": "g1"});
		assert_eq!(
			serde_json::to_value(&chain).unwrap(),
			json!({
				"class": OPERATION_CHAIN,
				"operations": [
					{
						"class": GET_ELEMENTS,
						"input": [
							{"class": ENTITY_SEED, "vertex": "foo"},
							{"class": ENTITY_SEED, "vertex": 2}
						],
						"options": options,
						"view": {"globalElements": [{"groupBy": []}]}
					},
					{"class": LIMIT, "resultLimit": 50, "truncate": true, "options": options},
					{"class": TO_SET, "options": options}
				],
				"options": options
			})
		);
	}

	#[test]
	fn builder_keeps_an_input_set() {
		let mut builder = OperationChainBuilder::default();
		let term = InputTerm {
			value_class: "java.lang.String".into(),
			parts: Parts::default(),
		};
		builder.add_input(term.clone());
		builder.add_input(term.clone());
		assert_eq!(builder.inputs().len(), 1);
		builder.remove_input(&term);
		assert!(builder.inputs().is_empty());
	}

	#[test]
	fn executed_chains_get_distinct_tickets() {
		let mut builder = OperationChainBuilder::default();
		let chain = OperationChain::new(vec![], Options::new());
		let a = builder.execute(chain.clone()).unwrap();
		let b = builder.execute(chain).unwrap();
		assert_ne!(a, b);
		assert_eq!(builder.take_pending().len(), 2);
		assert!(builder.pending().is_empty());
	}
}
