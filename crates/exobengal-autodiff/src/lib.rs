pub mod graph;
pub mod variable;
pub mod backward;

pub use graph::{reset_graph, NodeId};
pub use variable::Variable;
pub use backward::{backward, Gradients};
