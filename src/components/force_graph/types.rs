use crate::graph::{ClassSet, ElementData, ElementId};

/// Simulation payload of a node.
#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	/// Element id of the node.
	pub id: ElementId,
}

/// Simulation payload of an edge.
#[derive(Clone, Debug, Default)]
pub struct EdgeInfo {
	/// Element id of the edge.
	pub id: ElementId,
}

/// An element living on the canvas.
#[derive(Clone, Debug)]
pub struct SurfaceElement {
	/// Node or edge payload.
	pub data: ElementData,
	/// Style classes.
	pub classes: ClassSet,
	/// Selected flag.
	pub selected: bool,
}

impl SurfaceElement {
	/// Whether the element is a vertex.
	pub fn is_node(&self) -> bool {
		matches!(self.data, ElementData::Node { .. })
	}

	/// Text drawn next to the element.
	pub fn label(&self) -> Option<&str> {
		match &self.data {
			ElementData::Node { label, .. } => Some(label),
			ElementData::Edge { group, .. } => Some(group),
		}
	}

	/// Endpoints of an edge element.
	pub fn endpoints(&self) -> Option<(&str, &str)> {
		match &self.data {
			ElementData::Edge { source, target, .. } => Some((source, target)),
			ElementData::Node { .. } => None,
		}
	}
}
