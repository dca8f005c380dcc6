//! Drives one graph view: lifecycle, result events, surface events, filtering and
//! quick hops.
//!
//! All state changes happen on the caller's thread. Continuations of asynchronous work
//! (a configuration fetch, a query completing) are delivered back through
//! [`GraphController::configuration_loaded`] and [`GraphController::query_completed`],
//! both of which do nothing once the view has been torn down.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use serde_json::Value;

use super::classify::{Classifier, StyleClass, stylesheet};
use super::merge::{GraphState, MergeSummary, Merger};
use super::query::{self, QueryBuilder, QueryTicket};
use super::records::{ResultBatch, is_edge_id};
use super::schema::{Schema, TypeTable};
use super::selection::{SelectionContext, SelectionModel, SelectionSync};
use super::surface::{RenderSurface, SurfaceEvent, Transaction};
use super::tap::{TapDisambiguator, TapOutcome};
use super::vertex::ElementId;
use crate::config::{GraphConfiguration, GraphSession, OperationSettings};
use crate::error::{GraphError, Result};

/// Lifecycle stage of a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Built, not started.
	Created,
	/// Started, waiting for the configuration fetch.
	AwaitingConfiguration,
	/// Loaded and drawing.
	Ready,
	/// Torn down.
	Destroyed,
}

/// Notifications from the result stream.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultEvent {
	/// New results were appended to the store.
	Incoming(ResultBatch),
	/// The store was emptied.
	Cleared,
}

/// Collects what a [`GraphController`] needs.
pub struct GraphControllerBuilder<S, Q> {
	surface: S,
	query: Q,
	selection: Option<SelectionModel>,
	schema: Schema,
	types: TypeTable,
	session: Rc<RefCell<GraphSession>>,
	settings: OperationSettings,
	results: ResultBatch,
}

impl<S: RenderSurface, Q: QueryBuilder> GraphControllerBuilder<S, Q> {
	/// The selection model the view reports into. Required.
	pub fn selection(mut self, selection: SelectionModel) -> Self {
		self.selection = Some(selection);
		self
	}

	/// Schema used to classify records.
	pub fn schema(mut self, schema: Schema) -> Self {
		self.schema = schema;
		self
	}

	/// Type table used for parts and labels.
	pub fn types(mut self, types: TypeTable) -> Self {
		self.types = types;
		self
	}

	/// Session shared with other views.
	pub fn session(mut self, session: Rc<RefCell<GraphSession>>) -> Self {
		self.session = session;
		self
	}

	/// Settings for issued queries.
	pub fn settings(mut self, settings: OperationSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Results already received before the view was created.
	pub fn results(mut self, results: ResultBatch) -> Self {
		self.results = results;
		self
	}

	/// Builds the controller; fails without a selection model.
	pub fn build(self) -> Result<GraphController<S, Q>> {
		let selection = self.selection.ok_or(GraphError::MissingSelectionModel)?;
		Ok(GraphController {
			surface: self.surface,
			query: self.query,
			graph: GraphState::default(),
			selection,
			sync: SelectionSync::default(),
			taps: TapDisambiguator::default(),
			schema: self.schema,
			types: self.types,
			session: self.session,
			settings: self.settings,
			configuration: GraphConfiguration::default(),
			results: self.results,
			phase: Phase::Created,
			subscribed: false,
			pending_queries: Vec::new(),
		})
	}
}

/// State and behaviour behind one graph view.
pub struct GraphController<S, Q> {
	surface: S,
	query: Q,
	graph: GraphState,
	selection: SelectionModel,
	sync: SelectionSync,
	taps: TapDisambiguator,
	schema: Schema,
	types: TypeTable,
	session: Rc<RefCell<GraphSession>>,
	settings: OperationSettings,
	configuration: GraphConfiguration,
	results: ResultBatch,
	phase: Phase,
	subscribed: bool,
	pending_queries: Vec<QueryTicket>,
}

impl<S: RenderSurface, Q: QueryBuilder> GraphController<S, Q> {
	/// Starts building a controller around a surface and a query builder.
	pub fn builder(surface: S, query: Q) -> GraphControllerBuilder<S, Q> {
		GraphControllerBuilder {
			surface,
			query,
			selection: None,
			schema: Schema::default(),
			types: TypeTable::default(),
			session: Rc::default(),
			settings: OperationSettings::default(),
			results: ResultBatch::default(),
		}
	}

	/// Current lifecycle stage.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Whether the view is still waiting for its first load.
	pub fn is_loading(&self) -> bool {
		matches!(self.phase, Phase::Created | Phase::AwaitingConfiguration)
	}

	/// Whether result events are being honoured.
	pub fn is_subscribed(&self) -> bool {
		self.subscribed
	}

	/// Records behind the elements on the surface.
	pub fn graph(&self) -> &GraphState {
		&self.graph
	}

	/// The selection model.
	pub fn selection(&self) -> &SelectionModel {
		&self.selection
	}

	/// The rendering surface.
	pub fn surface(&self) -> &S {
		&self.surface
	}

	/// Direct access for input handling; call [`Self::process_events`] afterwards.
	pub fn surface_mut(&mut self) -> &mut S {
		&mut self.surface
	}

	/// The query builder.
	pub fn query(&self) -> &Q {
		&self.query
	}

	/// Mutable access to the query builder.
	pub fn query_mut(&mut self) -> &mut Q {
		&mut self.query
	}

	/// Loaded configuration.
	pub fn configuration(&self) -> &GraphConfiguration {
		&self.configuration
	}

	/// Results held for the next reset.
	pub fn results(&self) -> &ResultBatch {
		&self.results
	}

	/// Subscribes to results and loads straight away when the session already holds a
	/// configuration; otherwise waits for [`Self::configuration_loaded`].
	pub fn start(&mut self) -> Result<Phase> {
		if self.phase == Phase::Destroyed {
			return Err(GraphError::Destroyed);
		}
		self.subscribed = true;
		let cached = self.session.borrow().configuration().cloned();
		match cached {
			Some(configuration) => self.load(configuration)?,
			None => self.phase = Phase::AwaitingConfiguration,
		}
		Ok(self.phase)
	}

	/// Continuation of the configuration fetch.
	pub fn configuration_loaded(&mut self, doc: &Value) -> Result<()> {
		if self.phase == Phase::Destroyed {
			debug!("Configuration arrived after teardown, ignoring");
			return Ok(());
		}
		let configuration = GraphConfiguration::from_provider(doc)?;
		self.session
			.borrow_mut()
			.set_configuration(configuration.clone());
		self.load(configuration)
	}

	fn load(&mut self, configuration: GraphConfiguration) -> Result<()> {
		self.surface.set_stylesheet(stylesheet(&configuration));
		self.configuration = configuration;
		self.phase = Phase::Ready;
		self.reset()?;
		info!("Graph loaded with {} elements", self.surface.len());

		let term = self.session.borrow().search_term().map(str::to_owned);
		if let Some(term) = term {
			self.filter(&term);
		}
		Ok(())
	}

	/// Unsubscribes and releases the surface. Safe to call more than once.
	pub fn teardown(&mut self) {
		if self.phase == Phase::Destroyed {
			return;
		}
		self.subscribed = false;
		self.surface.destroy();
		self.taps.reset();
		self.pending_queries.clear();
		self.phase = Phase::Destroyed;
		info!("Graph view torn down");
	}

	/// Applies a result-stream notification. Rejected batches are not held.
	pub fn handle_results(&mut self, event: ResultEvent) -> Result<()> {
		if !self.subscribed {
			return Ok(());
		}
		match event {
			ResultEvent::Incoming(batch) if self.phase == Phase::Ready => {
				self.merge(&batch)?;
				self.results.extend(batch);
				self.redraw()?;
			}
			ResultEvent::Incoming(batch) => {
				self.stage(&batch)?;
				self.results.extend(batch);
			}
			ResultEvent::Cleared => {
				self.results = ResultBatch::default();
				if self.phase == Phase::Ready {
					self.reset()?;
				}
			}
		}
		Ok(())
	}

	/// Classifies `batch` against the current surface without changing anything.
	fn stage(&self, batch: &ResultBatch) -> Result<Transaction> {
		let classifier = Classifier::new(&self.schema, &self.types);
		Merger::new(classifier, &self.types, &self.selection).stage(batch, &self.surface)
	}

	fn merge(&mut self, batch: &ResultBatch) -> Result<MergeSummary> {
		self.ensure_live()?;
		let classifier = Classifier::new(&self.schema, &self.types);
		Merger::new(classifier, &self.types, &self.selection).merge(
			batch,
			&mut self.graph,
			&mut self.surface,
		)
	}

	/// Merges a batch into the view as one transaction, then redraws.
	pub fn update(&mut self, batch: &ResultBatch) -> Result<MergeSummary> {
		let summary = self.merge(batch)?;
		self.redraw()?;
		Ok(summary)
	}

	/// Removes every element, then merges the full current result set. A result set
	/// that fails to classify leaves the view untouched.
	pub fn reset(&mut self) -> Result<()> {
		let results = self.results.clone();
		self.stage(&results)?;
		self.clear()?;
		self.update(&results)?;
		Ok(())
	}

	/// Removes every element from the view.
	pub fn clear(&mut self) -> Result<()> {
		self.ensure_live()?;
		self.surface.remove_all();
		self.process_events()
	}

	/// Permanently removes filtered elements and re-runs the layout.
	pub fn redraw(&mut self) -> Result<()> {
		self.ensure_live()?;
		let filtered = self.surface.ids_with_class(&StyleClass::Filtered);
		if !filtered.is_empty() {
			debug!("Removing {} filtered elements", filtered.len());
			self.surface.remove(&filtered);
		}
		self.process_events()?;
		self.surface.run_layout(&self.configuration);
		Ok(())
	}

	/// Hides every node whose id does not contain `term`, ignoring case.
	pub fn filter(&mut self, term: &str) {
		let term = term.to_lowercase();
		for id in self.surface.node_ids() {
			if id.to_lowercase().contains(&term) {
				self.surface.remove_class(&id, &StyleClass::Filtered);
			} else {
				self.surface.add_class(&id, StyleClass::Filtered);
			}
		}
	}

	/// Records the search term for the session and applies it.
	pub fn search(&mut self, term: &str) {
		self.session.borrow_mut().set_search_term(term);
		if !term.is_empty() {
			self.filter(term);
		}
	}

	/// Advances the double-tap window.
	pub fn tick(&mut self, now: f64) {
		self.taps.tick(now);
	}

	/// Handles everything the surface reported since the last call.
	///
	/// Every event is handled even if one fails; the first error is returned.
	pub fn process_events(&mut self) -> Result<()> {
		let mut first_error = None;
		loop {
			let events = self.surface.take_events();
			if events.is_empty() {
				break;
			}
			for event in events {
				if let Err(e) = self.handle_surface_event(event) {
					warn!("{e}");
					first_error.get_or_insert(e);
				}
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	fn handle_surface_event(&mut self, event: SurfaceEvent) -> Result<()> {
		match event {
			SurfaceEvent::Select(id) => {
				let ctx = SelectionContext {
					graph: &self.graph,
					schema: &self.schema,
					types: &self.types,
				};
				self.sync
					.on_select(&id, ctx, &mut self.selection, &mut self.query)?;
			}
			SurfaceEvent::Unselect(id) => {
				self.sync
					.on_unselect(&id, &mut self.selection, &mut self.query);
			}
			SurfaceEvent::Removed(id) => {
				self.graph.remove(&id);
				self.sync
					.on_unselect(&id, &mut self.selection, &mut self.query);
			}
			SurfaceEvent::Tap { id: Some(id), at } => {
				if let TapOutcome::Double(id) = self.taps.tap(&id, at) {
					if !is_edge_id(&id) {
						self.quick_hop(Some(&id))?;
					}
				}
			}
			SurfaceEvent::Tap { id: None, at } => self.taps.tap_background(at),
		}
		Ok(())
	}

	/// Runs a one-hop query from `origin`, or from every selected entity when no
	/// origin is given.
	pub fn quick_hop(&mut self, origin: Option<&str>) -> Result<QueryTicket> {
		self.ensure_live()?;
		let seeds: Vec<ElementId> = match origin {
			Some(id) => vec![id.to_owned()],
			None => self.selection.entity_ids(),
		};
		let (get, chain) = query::quick_hop(&seeds, &self.settings).inspect_err(|e| {
			warn!("Quick hop rejected: {e}");
		})?;
		self.query.add_operation(get);
		let ticket = self.query.execute(chain)?;
		self.pending_queries.push(ticket);
		info!("Quick hop from {} seeds submitted as {ticket:?}", seeds.len());
		Ok(ticket)
	}

	/// Continuation of a quick hop: clears the selection once its query finishes.
	pub fn query_completed(&mut self, ticket: QueryTicket) -> Result<()> {
		if self.phase == Phase::Destroyed {
			return Ok(());
		}
		let Some(pos) = self.pending_queries.iter().position(|t| *t == ticket) else {
			return Ok(());
		};
		self.pending_queries.remove(pos);
		self.deselect_all()
	}

	/// Unselects every element.
	pub fn deselect_all(&mut self) -> Result<()> {
		self.ensure_live()?;
		self.surface.unselect_all();
		self.process_events()
	}

	/// Removes every selected element and empties the selection.
	pub fn remove_selected(&mut self) -> Result<()> {
		self.ensure_live()?;
		let selected = self.surface.selected_ids();
		self.surface.remove(&selected);
		self.surface.unselect_all();
		let result = self.process_events();
		self.sync.clear(&mut self.query);
		self.selection.clear();
		result
	}

	fn ensure_live(&self) -> Result<()> {
		match self.phase {
			Phase::Destroyed => Err(GraphError::Destroyed),
			_ => Ok(()),
		}
	}
}
