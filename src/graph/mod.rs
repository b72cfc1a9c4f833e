mod graph;

pub mod geo;

pub use graph::{Edge, Graph, Node};
