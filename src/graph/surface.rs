//! The rendering surface as seen by the engine.
//!
//! The surface owns the visual elements. The engine mutates it through
//! [`RenderSurface`] and learns about user interaction (and about removals it did not
//! initiate) by draining [`SurfaceEvent`]s after every call.

use super::classify::{ClassSet, StyleClass, StyleRule};
use super::vertex::ElementId;
use crate::config::GraphConfiguration;

/// Where freshly added vertices are placed before layout runs.
pub const PLACEHOLDER_POSITION: (f64, f64) = (100.0, 100.0);

/// What an element is.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementData {
	/// A vertex.
	Node {
		/// Text drawn next to the node.
		label: String,
		/// Initial position.
		position: (f64, f64),
	},
	/// A relation between two vertex elements.
	Edge {
		/// Source vertex id.
		source: ElementId,
		/// Target vertex id.
		target: ElementId,
		/// Edge group, drawn as the label.
		group: String,
	},
}

/// An element staged for addition.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSpec {
	/// Element id.
	pub id: ElementId,
	/// Node or edge payload.
	pub data: ElementData,
	/// Initial style classes.
	pub classes: ClassSet,
	/// Initial selected flag.
	pub selected: bool,
}

impl ElementSpec {
	/// Whether the staged element is a vertex.
	pub fn is_node(&self) -> bool {
		matches!(self.data, ElementData::Node { .. })
	}
}

/// Interaction and lifecycle notifications raised by the surface.
#[derive(Clone, Debug, PartialEq)]
pub enum SurfaceEvent {
	/// An element became selected.
	Select(ElementId),
	/// An element stopped being selected.
	Unselect(ElementId),
	/// An element or the background was tapped.
	Tap {
		/// `None` for the background.
		id: Option<ElementId>,
		/// Timestamp in milliseconds.
		at: f64,
	},
	/// An element left the surface.
	Removed(ElementId),
}

/// Element adds and class merges applied to the surface in one step.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
	adds: Vec<ElementSpec>,
	merges: Vec<(ElementId, ClassSet)>,
}

impl Transaction {
	/// An empty transaction.
	pub fn new() -> Self {
		Self::default()
	}

	/// Elements to add, in staging order.
	pub fn adds(&self) -> &[ElementSpec] {
		&self.adds
	}

	/// Class merges for live elements.
	pub fn merges(&self) -> &[(ElementId, ClassSet)] {
		&self.merges
	}

	/// Whether nothing is staged.
	pub fn is_empty(&self) -> bool {
		self.adds.is_empty() && self.merges.is_empty()
	}

	/// Splits into adds and merges for committing.
	pub fn into_parts(self) -> (Vec<ElementSpec>, Vec<(ElementId, ClassSet)>) {
		(self.adds, self.merges)
	}

	/// A staged addition by id.
	pub fn staged(&self, id: &str) -> Option<&ElementSpec> {
		self.adds.iter().find(|e| e.id == id)
	}

	pub(crate) fn staged_mut(&mut self, id: &str) -> Option<&mut ElementSpec> {
		self.adds.iter_mut().find(|e| e.id == id)
	}

	pub(crate) fn stage(&mut self, element: ElementSpec) {
		self.adds.push(element);
	}

	/// Queues `classes` for an element that is already live on the surface.
	pub(crate) fn merge_live(&mut self, id: &str, classes: &ClassSet) {
		match self.merges.iter_mut().find(|(m, _)| m == id) {
			Some((_, pending)) => pending.merge(classes),
			None => self.merges.push((id.to_owned(), classes.clone())),
		}
	}
}

/// Operations the engine needs from a rendering surface.
pub trait RenderSurface {
	/// Whether an element with this id is on the surface.
	fn contains(&self, id: &str) -> bool;

	/// Every element id, nodes first.
	fn element_ids(&self) -> Vec<ElementId>;

	/// Ids of vertex elements.
	fn node_ids(&self) -> Vec<ElementId>;

	/// Applies every add, then every class merge, without exposing the
	/// intermediate state.
	fn commit(&mut self, transaction: Transaction);

	/// Whether the element carries `class`.
	fn has_class(&self, id: &str, class: &StyleClass) -> bool;

	/// Adds a class to a live element.
	fn add_class(&mut self, id: &str, class: StyleClass);

	/// Removes a class from a live element.
	fn remove_class(&mut self, id: &str, class: &StyleClass);

	/// Whether the element is selected.
	fn is_selected(&self, id: &str) -> bool;

	/// Selects an element, raising [`SurfaceEvent::Select`] if it was not selected.
	fn select(&mut self, id: &str);

	/// Unselects an element, raising [`SurfaceEvent::Unselect`] if it was selected.
	fn unselect(&mut self, id: &str);

	/// Removes elements (and edges attached to removed nodes), raising
	/// [`SurfaceEvent::Removed`] for each.
	fn remove(&mut self, ids: &[ElementId]);

	/// Replaces the style sheet.
	fn set_stylesheet(&mut self, rules: Vec<StyleRule>);

	/// Lays out the current elements.
	fn run_layout(&mut self, config: &GraphConfiguration);

	/// Drains the events raised since the last call.
	fn take_events(&mut self) -> Vec<SurfaceEvent>;

	/// Releases the surface; later calls are ignored.
	fn destroy(&mut self);

	/// Number of elements.
	fn len(&self) -> usize {
		self.element_ids().len()
	}

	/// Whether the surface holds no elements.
	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Ids of elements carrying `class`.
	fn ids_with_class(&self, class: &StyleClass) -> Vec<ElementId> {
		self.element_ids()
			.into_iter()
			.filter(|id| self.has_class(id, class))
			.collect()
	}

	/// Ids of selected elements.
	fn selected_ids(&self) -> Vec<ElementId> {
		self.element_ids()
			.into_iter()
			.filter(|id| self.is_selected(id))
			.collect()
	}

	/// Removes every element.
	fn remove_all(&mut self) {
		let ids = self.element_ids();
		self.remove(&ids);
	}

	/// Unselects every selected element.
	fn unselect_all(&mut self) {
		for id in self.selected_ids() {
			self.unselect(&id);
		}
	}
}
