use exobengal_core::Tensor;
use std::cell::RefCell;

/// Index of a node in the computation graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// The operation that produced a node.
#[derive(Debug, Clone)]
pub enum Op {
    /// Parameter or input.
    Leaf,
    Add(NodeId, NodeId),
    Sub(NodeId, NodeId),
    Mul(NodeId, NodeId),
    MatMul(NodeId, NodeId),
    Neg(NodeId),
    Ln(NodeId),
    Relu(NodeId),
    Sigmoid(NodeId),
    MeanAll(NodeId),
    AddScalar(NodeId, f64),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub op: Op,
    pub value: Tensor<f64>,
    pub requires_grad: bool,
}

/// Nodes in the order they were recorded, which is a topological order.
#[derive(Debug, Default)]
pub struct Graph {
    pub nodes: Vec<Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, op: Op, value: Tensor<f64>, requires_grad: bool) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            op,
            value,
            requires_grad,
        });
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

thread_local! {
    static CURRENT_GRAPH: RefCell<Graph> = RefCell::new(Graph::new());
}

/// Run `f` against this thread's graph.
pub fn with_graph<F, R>(f: F) -> R
where
    F: FnOnce(&mut Graph) -> R,
{
    CURRENT_GRAPH.with(|g| f(&mut g.borrow_mut()))
}

/// Drop every node recorded on this thread. Call once per training step;
/// variables created before the reset must not be reused afterwards.
pub fn reset_graph() {
    CURRENT_GRAPH.with(|g| {
        *g.borrow_mut() = Graph::new();
    });
}
