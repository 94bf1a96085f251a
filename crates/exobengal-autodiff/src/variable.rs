use crate::graph::{with_graph, NodeId, Op};
use exobengal_core::{Tensor, TensorResult};

/// A tensor recorded on the thread-local computation graph.
#[derive(Debug, Clone)]
pub struct Variable {
    pub node_id: NodeId,
    pub data: Tensor<f64>,
}

impl Variable {
    /// Create a leaf variable.
    pub fn new(data: Tensor<f64>, requires_grad: bool) -> Self {
        let node_id = with_graph(|g| g.add_node(Op::Leaf, data.clone(), requires_grad));
        Variable { node_id, data }
    }

    /// Trainable leaf.
    pub fn param(data: Tensor<f64>) -> Self {
        Self::new(data, true)
    }

    /// Constant leaf (inputs, targets, masks).
    pub fn input(data: Tensor<f64>) -> Self {
        Self::new(data, false)
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.data.shape_vec()
    }

    fn record(op: Op, data: Tensor<f64>) -> Variable {
        let node_id = with_graph(|g| g.add_node(op, data.clone(), true));
        Variable { node_id, data }
    }

    pub fn add(&self, other: &Variable) -> TensorResult<Variable> {
        let result = self.data.add(&other.data)?;
        Ok(Self::record(Op::Add(self.node_id, other.node_id), result))
    }

    pub fn sub(&self, other: &Variable) -> TensorResult<Variable> {
        let result = self.data.sub(&other.data)?;
        Ok(Self::record(Op::Sub(self.node_id, other.node_id), result))
    }

    /// Element-wise product.
    pub fn mul(&self, other: &Variable) -> TensorResult<Variable> {
        let result = self.data.mul(&other.data)?;
        Ok(Self::record(Op::Mul(self.node_id, other.node_id), result))
    }

    pub fn matmul(&self, other: &Variable) -> TensorResult<Variable> {
        let result = self.data.matmul(&other.data)?;
        Ok(Self::record(Op::MatMul(self.node_id, other.node_id), result))
    }

    pub fn neg(&self) -> Variable {
        Self::record(Op::Neg(self.node_id), self.data.mul_scalar(-1.0))
    }

    pub fn ln(&self) -> Variable {
        Self::record(Op::Ln(self.node_id), self.data.ln())
    }

    pub fn relu(&self) -> Variable {
        Self::record(Op::Relu(self.node_id), self.data.relu())
    }

    pub fn sigmoid(&self) -> Variable {
        Self::record(Op::Sigmoid(self.node_id), self.data.sigmoid())
    }

    pub fn add_scalar(&self, s: f64) -> Variable {
        Self::record(Op::AddScalar(self.node_id, s), self.data.add_scalar(s))
    }

    /// Mean of all elements, as a 0-d variable.
    pub fn mean(&self) -> Variable {
        Self::record(Op::MeanAll(self.node_id), Tensor::scalar(self.data.mean_all()))
    }
}
