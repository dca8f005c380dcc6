//! Canvas rendering surface for result graphs.

mod component;
mod render;
mod state;
mod style;
mod types;

pub use component::ResultGraphCanvas;
pub use state::{DragState, ForceGraphState, HoverState, PanState, ViewTransform};
pub use style::ResolvedStyle;
pub use types::{EdgeInfo, NodeInfo, SurfaceElement};
