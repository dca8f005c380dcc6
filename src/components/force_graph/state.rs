use std::collections::{BTreeMap, HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, warn};

use super::style::ResolvedStyle;
use super::types::{EdgeInfo, NodeInfo, SurfaceElement};
use crate::config::{GraphConfiguration, Physics};
use crate::graph::{
	ElementData, ElementId, RenderSurface, StyleClass, StyleRule, SurfaceEvent, Transaction,
};

/// World-space radius within which a pointer hits a node.
pub const HIT_RADIUS: f64 = 12.0;
const EDGE_HIT_DISTANCE: f64 = 4.0;
const STEP: f32 = 0.016;

/// Pan offset and zoom factor of the view.
#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	/// Horizontal offset in screen pixels.
	pub x: f64,
	/// Vertical offset in screen pixels.
	pub y: f64,
	/// Zoom factor.
	pub k: f64,
}

/// Node drag in progress.
#[derive(Clone, Debug, Default)]
pub struct DragState {
	/// Whether a press landed on a node.
	pub active: bool,
	/// Node being dragged.
	pub node_idx: Option<DefaultNodeIdx>,
	/// Whether the pointer travelled far enough to stop counting as a click.
	pub moved: bool,
	/// Pointer position at the press.
	pub start_x: f64,
	/// Pointer position at the press.
	pub start_y: f64,
	/// Node position at the press.
	pub node_start_x: f32,
	/// Node position at the press.
	pub node_start_y: f32,
}

/// Background pan in progress.
#[derive(Clone, Debug, Default)]
pub struct PanState {
	/// Whether a press landed on the background.
	pub active: bool,
	/// Pointer position at the press.
	pub start_x: f64,
	/// Pointer position at the press.
	pub start_y: f64,
	/// View offset at the press.
	pub transform_start_x: f64,
	/// View offset at the press.
	pub transform_start_y: f64,
}

/// Hovered node, its neighbours and the highlight fade.
#[derive(Clone, Debug, Default)]
pub struct HoverState {
	/// Node under the pointer.
	pub node: Option<DefaultNodeIdx>,
	/// Nodes sharing an edge with the hovered node.
	pub neighbors: HashSet<DefaultNodeIdx>,
	/// Highlight progress from 0 to 1.
	pub highlight_t: f64,
	/// Node fading out after the pointer left it.
	pub prev_node: Option<DefaultNodeIdx>,
	/// Neighbours of the fading node.
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

fn simulation_parameters(physics: &Physics) -> SimulationParameters {
	SimulationParameters {
		force_charge: physics.charge_force,
		force_spring: physics.spring_force,
		force_max: physics.max_force,
		node_speed: physics.node_speed,
		damping_factor: physics.damping,
	}
}

/// Canvas-backed rendering surface.
///
/// Elements are keyed by id and carry their style classes and selected flag. The force
/// simulation is derived from them and rebuilt whenever the element set changes;
/// simulated nodes keep their positions across rebuilds.
pub struct ForceGraphState {
	/// Force simulation derived from the elements.
	pub graph: ForceGraph<NodeInfo, EdgeInfo>,
	/// Current pan and zoom.
	pub transform: ViewTransform,
	/// Node drag state.
	pub drag: DragState,
	/// Background pan state.
	pub pan: PanState,
	/// Hover highlight state.
	pub hover: HoverState,
	/// Canvas size in pixels.
	pub width: f64,
	/// Canvas size in pixels.
	pub height: f64,
	/// Whether the simulation advances each frame.
	pub animation_running: bool,
	/// Seconds of animation, drives the edge dash flow.
	pub flow_time: f64,
	elements: BTreeMap<ElementId, SurfaceElement>,
	stylesheet: Vec<StyleRule>,
	physics: Physics,
	node_index: HashMap<ElementId, DefaultNodeIdx>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx)>,
	simulation_stale: bool,
	events: Vec<SurfaceEvent>,
	destroyed: bool,
}

impl ForceGraphState {
	/// An empty surface of the given size.
	pub fn new(width: f64, height: f64) -> Self {
		let physics = Physics::default();
		Self {
			graph: ForceGraph::new(simulation_parameters(&physics)),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			elements: BTreeMap::new(),
			stylesheet: Vec::new(),
			physics,
			node_index: HashMap::new(),
			edges: Vec::new(),
			simulation_stale: false,
			events: Vec::new(),
			destroyed: false,
		}
	}

	/// Element by id.
	pub fn element(&self, id: &str) -> Option<&SurfaceElement> {
		self.elements.get(id)
	}

	/// Style resolved from the element's classes; the default for unknown ids.
	pub fn style_of(&self, id: &str) -> ResolvedStyle {
		self.elements
			.get(id)
			.map(|e| ResolvedStyle::resolve(&self.stylesheet, &e.classes))
			.unwrap_or_default()
	}

	/// Whether [`RenderSurface::destroy`] has run.
	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	/// Position of a simulated node.
	pub fn node_position(&self, id: &str) -> Option<(f64, f64)> {
		let idx = *self.node_index.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	/// Rebuilds the simulation from the element set. Nodes already simulated keep their
	/// positions; new ones are spread on a circle around the centre.
	fn rebuild_simulation(&mut self) {
		let mut previous: HashMap<ElementId, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			previous.insert(
				node.data.user_data.id.clone(),
				(node.x(), node.y(), node.data.is_anchor),
			);
		});

		let mut graph = ForceGraph::new(simulation_parameters(&self.physics));
		self.node_index.clear();
		self.edges.clear();

		let nodes: Vec<&ElementId> = self
			.elements
			.iter()
			.filter(|(_, e)| e.is_node())
			.map(|(id, _)| id)
			.collect();
		let count = nodes.len().max(1) as f64;
		for (i, id) in nodes.into_iter().enumerate() {
			let (x, y, is_anchor) = previous.get(id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / count;
				(
					(100.0 * angle.cos()) as f32,
					(100.0 * angle.sin()) as f32,
					false,
				)
			});
			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor,
				user_data: NodeInfo { id: id.clone() },
			});
			self.node_index.insert(id.clone(), idx);
		}

		for (id, element) in &self.elements {
			let Some((source, target)) = element.endpoints() else {
				continue;
			};
			if let (Some(&src), Some(&tgt)) =
				(self.node_index.get(source), self.node_index.get(target))
			{
				graph.add_edge(
					src,
					tgt,
					EdgeData {
						user_data: EdgeInfo { id: id.clone() },
					},
				);
				self.edges.push((src, tgt));
			}
		}

		self.graph = graph;
		self.simulation_stale = false;
		// node indices changed
		self.hover = HoverState::default();
		self.drag = DragState::default();
	}

	fn ensure_simulation(&mut self) {
		if self.simulation_stale {
			self.rebuild_simulation();
		}
	}

	/// Scales and centres the view so every visible node fits.
	pub fn fit_to_view(&mut self) {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			bounds = Some(match bounds {
				None => (x, y, x, y),
				Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
			});
		});
		let Some((x0, y0, x1, y1)) = bounds else {
			return;
		};
		let padding = 4.0 * HIT_RADIUS;
		let k = (self.width / (x1 - x0 + padding))
			.min(self.height / (y1 - y0 + padding))
			.clamp(0.1, 10.0);
		self.transform = ViewTransform {
			x: self.width / 2.0 - (x0 + x1) / 2.0 * k,
			y: self.height / 2.0 - (y0 + y1) / 2.0 * k,
			k,
		};
	}

	/// Converts screen coordinates to simulation coordinates.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Visible node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if self.style_of(&node.data.user_data.id).hidden {
				return;
			}
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	/// Element id of a simulated node.
	pub fn node_id(&self, idx: DefaultNodeIdx) -> Option<ElementId> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.id.clone());
			}
		});
		found
	}

	/// Edge passing close to a screen position.
	pub fn edge_at_position(&self, sx: f64, sy: f64) -> Option<ElementId> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let limit = EDGE_HIT_DISTANCE / self.transform.k;
		let mut found = None;
		self.graph.visit_edges(|n1, n2, edge| {
			let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
			let (dx, dy) = (x2 - x1, y2 - y1);
			let len2 = dx * dx + dy * dy;
			if len2 < 0.001 {
				return;
			}
			let t = (((gx - x1) * dx + (gy - y1) * dy) / len2).clamp(0.0, 1.0);
			let (px, py) = (x1 + t * dx - gx, y1 + t * dy - gy);
			if (px * px + py * py).sqrt() < limit {
				found = Some(edge.user_data.id.clone());
			}
		});
		found
	}

	/// Handles a click at screen coordinates: taps and selects whatever is under the
	/// pointer, or clears the selection when clicking the background.
	pub fn click(&mut self, sx: f64, sy: f64, additive: bool, at: f64) {
		let target = self
			.node_at_position(sx, sy)
			.and_then(|idx| self.node_id(idx))
			.or_else(|| self.edge_at_position(sx, sy));
		match target {
			Some(id) => self.tap_element(&id, additive, at),
			None => {
				self.events.push(SurfaceEvent::Tap { id: None, at });
				self.unselect_all();
			}
		}
	}

	/// Clicks an element by id, as if the pointer had hit it.
	pub fn click_id(&mut self, id: &str, at: f64) {
		if self.contains(id) {
			self.tap_element(id, false, at);
		}
	}

	fn tap_element(&mut self, id: &str, additive: bool, at: f64) {
		self.events.push(SurfaceEvent::Tap {
			id: Some(id.to_owned()),
			at,
		});
		if additive {
			if self.is_selected(id) {
				self.unselect(id);
			} else {
				self.select(id);
			}
		} else {
			for other in self.selected_ids() {
				if other != id {
					self.unselect(&other);
				}
			}
			self.select(id);
		}
	}

	/// Starts or ends hover highlighting.
	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for &(src, tgt) in &self.edges {
				if src == idx {
					self.hover.neighbors.insert(tgt);
				} else if tgt == idx {
					self.hover.neighbors.insert(src);
				}
			}
		}
	}

	/// Whether a node is hovered, fading, or next to either.
	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	/// Whether a node is hovered or fading out.
	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	/// Whether any hover highlight is showing.
	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	/// Advances the simulation and the hover fade by `dt` seconds.
	pub fn tick(&mut self, dt: f32) {
		if self.destroyed {
			return;
		}
		self.ensure_simulation();
		self.graph.update(dt);
		self.flow_time += dt as f64;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	/// Records a new canvas size.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

impl RenderSurface for ForceGraphState {
	fn contains(&self, id: &str) -> bool {
		self.elements.contains_key(id)
	}

	fn element_ids(&self) -> Vec<ElementId> {
		let (nodes, edges): (Vec<_>, Vec<_>) =
			self.elements.iter().partition(|(_, e)| e.is_node());
		nodes
			.into_iter()
			.chain(edges)
			.map(|(id, _)| id.clone())
			.collect()
	}

	fn node_ids(&self) -> Vec<ElementId> {
		self.elements
			.iter()
			.filter(|(_, e)| e.is_node())
			.map(|(id, _)| id.clone())
			.collect()
	}

	fn commit(&mut self, transaction: Transaction) {
		if self.destroyed {
			return;
		}
		let (adds, merges) = transaction.into_parts();
		let (added, merged) = (adds.len(), merges.len());
		// nodes first so every edge finds its endpoints
		let (nodes, edges): (Vec<_>, Vec<_>) = adds.into_iter().partition(|e| e.is_node());
		for spec in nodes.into_iter().chain(edges) {
			if self.elements.contains_key(&spec.id) {
				warn!("Ignoring duplicate element {:?}", spec.id);
				continue;
			}
			if let ElementData::Edge { source, target, .. } = &spec.data {
				if !self.elements.contains_key(source) || !self.elements.contains_key(target) {
					warn!("Ignoring edge {:?} with a missing endpoint", spec.id);
					continue;
				}
			}
			self.elements.insert(
				spec.id,
				SurfaceElement {
					data: spec.data,
					classes: spec.classes,
					selected: spec.selected,
				},
			);
		}
		for (id, classes) in merges {
			if let Some(element) = self.elements.get_mut(&id) {
				element.classes.merge(&classes);
			}
		}
		self.simulation_stale = true;
		debug!("Committed {added} element adds and {merged} class merges");
	}

	fn has_class(&self, id: &str, class: &StyleClass) -> bool {
		self.elements
			.get(id)
			.is_some_and(|e| e.classes.contains(class))
	}

	fn add_class(&mut self, id: &str, class: StyleClass) {
		if let Some(element) = self.elements.get_mut(id) {
			element.classes.insert(class);
		}
	}

	fn remove_class(&mut self, id: &str, class: &StyleClass) {
		if let Some(element) = self.elements.get_mut(id) {
			element.classes.remove(class);
		}
	}

	fn is_selected(&self, id: &str) -> bool {
		self.elements.get(id).is_some_and(|e| e.selected)
	}

	fn select(&mut self, id: &str) {
		if let Some(element) = self.elements.get_mut(id) {
			if !element.selected {
				element.selected = true;
				self.events.push(SurfaceEvent::Select(id.to_owned()));
			}
		}
	}

	fn unselect(&mut self, id: &str) {
		if let Some(element) = self.elements.get_mut(id) {
			if element.selected {
				element.selected = false;
				self.events.push(SurfaceEvent::Unselect(id.to_owned()));
			}
		}
	}

	fn remove(&mut self, ids: &[ElementId]) {
		let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
		let mut removed: Vec<ElementId> = self
			.elements
			.iter()
			.filter(|(id, e)| match e.endpoints() {
				Some((source, target)) => {
					doomed.contains(id.as_str())
						|| doomed.contains(source)
						|| doomed.contains(target)
				}
				None => false,
			})
			.map(|(id, _)| id.clone())
			.collect();
		removed.extend(
			ids.iter()
				.filter(|id| self.elements.get(id.as_str()).is_some_and(SurfaceElement::is_node))
				.cloned(),
		);
		for id in removed {
			if self.elements.remove(&id).is_some() {
				self.events.push(SurfaceEvent::Removed(id));
				self.simulation_stale = true;
			}
		}
	}

	fn set_stylesheet(&mut self, rules: Vec<StyleRule>) {
		self.stylesheet = rules;
	}

	fn run_layout(&mut self, config: &GraphConfiguration) {
		if self.destroyed {
			return;
		}
		self.physics = config.physics.clone();
		self.rebuild_simulation();
		if !config.animate {
			for _ in 0..config.iterations {
				self.graph.update(STEP);
			}
		}
		if config.fit {
			self.fit_to_view();
		}
		self.animation_running = true;
	}

	fn take_events(&mut self) -> Vec<SurfaceEvent> {
		std::mem::take(&mut self.events)
	}

	fn destroy(&mut self) {
		self.destroyed = true;
		self.animation_running = false;
		self.elements.clear();
		self.events.clear();
		self.node_index.clear();
		self.edges.clear();
		self.graph = ForceGraph::new(simulation_parameters(&self.physics));
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{ClassSet, ElementSpec, PLACEHOLDER_POSITION};

	fn node(id: &str) -> ElementSpec {
		ElementSpec {
			id: id.into(),
			data: ElementData::Node {
				label: id.into(),
				position: PLACEHOLDER_POSITION,
			},
			classes: [StyleClass::DefaultVertex].into_iter().collect(),
			selected: false,
		}
	}

	fn link(source: &str, target: &str) -> ElementSpec {
		ElementSpec {
			id: format!("{source}->{target}\0"),
			data: ElementData::Edge {
				source: source.into(),
				target: target.into(),
				group: "g".into(),
			},
			classes: ClassSet::new(),
			selected: false,
		}
	}

	fn surface_with(specs: Vec<ElementSpec>) -> ForceGraphState {
		let mut tx = Transaction::new();
		for spec in specs {
			tx.stage(spec);
		}
		let mut surface = ForceGraphState::new(800.0, 600.0);
		surface.commit(tx);
		surface
	}

	#[test]
	fn commit_adds_nodes_before_edges() {
		let surface = surface_with(vec![link("a", "b"), node("a"), node("b")]);
		assert_eq!(surface.len(), 3);
		assert_eq!(surface.node_ids(), ["a", "b"]);
		assert_eq!(surface.element_ids().last().map(String::as_str), Some("a->b\0"));
	}

	#[test]
	fn removing_a_node_takes_its_edges() {
		let mut surface = surface_with(vec![node("a"), node("b"), node("c"), link("a", "b")]);
		surface.remove(&["b".to_owned()]);
		let events = surface.take_events();
		assert_eq!(events.len(), 2);
		assert!(events.contains(&SurfaceEvent::Removed("b".into())));
		assert!(events.contains(&SurfaceEvent::Removed("a->b\0".into())));
		assert_eq!(surface.node_ids(), ["a", "c"]);
	}

	#[test]
	fn selection_changes_raise_events_once() {
		let mut surface = surface_with(vec![node("a")]);
		surface.select("a");
		surface.select("a");
		surface.unselect("a");
		surface.select("missing");
		assert_eq!(
			surface.take_events(),
			[
				SurfaceEvent::Select("a".into()),
				SurfaceEvent::Unselect("a".into())
			]
		);
	}

	#[test]
	fn layout_keeps_known_positions() {
		let mut surface = surface_with(vec![node("a"), node("b"), link("a", "b")]);
		let config = GraphConfiguration::default();
		surface.run_layout(&config);
		let before = surface.node_position("a").unwrap();

		let mut tx = Transaction::new();
		tx.stage(node("c"));
		surface.commit(tx);
		surface.rebuild_simulation();
		assert_eq!(surface.node_position("a"), Some(before));
		assert!(surface.node_position("c").is_some());
	}

	#[test]
	fn clicking_a_node_taps_and_selects_it() {
		let mut surface = surface_with(vec![node("a")]);
		surface.run_layout(&GraphConfiguration::default());
		let (x, y) = surface.node_position("a").unwrap();
		let (sx, sy) = (
			x * surface.transform.k + surface.transform.x,
			y * surface.transform.k + surface.transform.y,
		);
		surface.click(sx, sy, false, 10.0);
		assert_eq!(
			surface.take_events(),
			[
				SurfaceEvent::Tap {
					id: Some("a".into()),
					at: 10.0
				},
				SurfaceEvent::Select("a".into())
			]
		);

		surface.click(-10_000.0, -10_000.0, false, 20.0);
		assert_eq!(
			surface.take_events(),
			[
				SurfaceEvent::Tap { id: None, at: 20.0 },
				SurfaceEvent::Unselect("a".into())
			]
		);
	}

	#[test]
	fn destroyed_surfaces_ignore_commits() {
		let mut surface = surface_with(vec![node("a")]);
		surface.destroy();
		assert!(surface.is_empty());
		let mut tx = Transaction::new();
		tx.stage(node("b"));
		surface.commit(tx);
		assert!(surface.is_empty());
	}
}
