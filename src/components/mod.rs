/// Canvas rendering surface and the graph view component.
pub mod force_graph;
