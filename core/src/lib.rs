pub mod formula;
pub mod graph;
pub mod real;
pub mod stream;
pub mod table;

pub use graph::{DependencyGraph, GraphError, Node, NodeId};
pub use real::{BoundedScalar, FormatOptions, FormulaNode, PrintStyle, RealValued};
pub use stream::{Mode, Serializable};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
