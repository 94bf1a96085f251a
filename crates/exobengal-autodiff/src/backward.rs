use std::collections::HashMap;

use crate::graph::{with_graph, Graph, NodeId, Op};
use crate::variable::Variable;
use exobengal_core::{Tensor, TensorResult};

/// Gradients keyed by the node they belong to.
#[derive(Debug, Default)]
pub struct Gradients {
    grads: HashMap<NodeId, Tensor<f64>>,
}

impl Gradients {
    pub fn get(&self, id: NodeId) -> Option<&Tensor<f64>> {
        self.grads.get(&id)
    }

    /// Gradient of `var`, or zeros when the loss does not depend on it.
    pub fn wrt(&self, var: &Variable) -> Tensor<f64> {
        self.grads
            .get(&var.node_id)
            .cloned()
            .unwrap_or_else(|| Tensor::zeros(var.shape_vec()))
    }

    fn accumulate(&mut self, graph: &Graph, id: NodeId, incoming: Tensor<f64>) -> TensorResult<()> {
        let node = graph.get(id);
        if !node.requires_grad {
            return Ok(());
        }
        let grad = reduce_broadcast(incoming, node.value.shape().dims())?;
        match self.grads.remove(&id) {
            Some(existing) => {
                self.grads.insert(id, existing.add(&grad)?);
            }
            None => {
                self.grads.insert(id, grad);
            }
        }
        Ok(())
    }
}

/// Reverse-mode differentiation of `loss` over the current thread's graph.
pub fn backward(loss: &Variable) -> TensorResult<Gradients> {
    with_graph(|graph| {
        let mut grads = Gradients::default();
        grads
            .grads
            .insert(loss.node_id, Tensor::ones(loss.shape_vec()));

        // Nodes are pushed in forward order, so walking backwards is topological.
        for idx in (0..=loss.node_id.0).rev() {
            let node_id = NodeId(idx);
            let grad = match grads.grads.get(&node_id) {
                Some(g) => g.clone(),
                None => continue,
            };
            let node = graph.get(node_id);

            match node.op {
                Op::Leaf => {}
                Op::Add(a, b) => {
                    grads.accumulate(graph, a, grad.clone())?;
                    grads.accumulate(graph, b, grad)?;
                }
                Op::Sub(a, b) => {
                    grads.accumulate(graph, a, grad.clone())?;
                    grads.accumulate(graph, b, grad.mul_scalar(-1.0))?;
                }
                Op::Mul(a, b) => {
                    let ga = grad.mul(&graph.get(b).value)?;
                    let gb = grad.mul(&graph.get(a).value)?;
                    grads.accumulate(graph, a, ga)?;
                    grads.accumulate(graph, b, gb)?;
                }
                Op::MatMul(a, b) => {
                    // dA = G·Bᵀ, dB = Aᵀ·G
                    if graph.get(a).requires_grad {
                        let ga = grad.matmul(&graph.get(b).value.t()?)?;
                        grads.accumulate(graph, a, ga)?;
                    }
                    if graph.get(b).requires_grad {
                        let gb = graph.get(a).value.t()?.matmul(&grad)?;
                        grads.accumulate(graph, b, gb)?;
                    }
                }
                Op::Neg(a) => {
                    grads.accumulate(graph, a, grad.mul_scalar(-1.0))?;
                }
                Op::Ln(a) => {
                    let ga = grad.div(&graph.get(a).value)?;
                    grads.accumulate(graph, a, ga)?;
                }
                Op::Relu(a) => {
                    let mask = graph.get(a).value.apply(|x| if x > 0.0 { 1.0 } else { 0.0 });
                    grads.accumulate(graph, a, mask.mul(&grad)?)?;
                }
                Op::Sigmoid(a) => {
                    // σ' = σ(1 − σ)
                    let sig = &node.value;
                    let local = sig.apply(|s| s * (1.0 - s));
                    grads.accumulate(graph, a, local.mul(&grad)?)?;
                }
                Op::MeanAll(a) => {
                    let input = &graph.get(a).value;
                    let scale = grad.item()? / input.numel() as f64;
                    grads.accumulate(graph, a, Tensor::full(input.shape_vec(), scale))?;
                }
                Op::AddScalar(a, _) => {
                    grads.accumulate(graph, a, grad)?;
                }
            }
        }

        Ok(grads)
    })
}

/// Sum a gradient back down to the shape of a broadcast operand.
fn reduce_broadcast(grad: Tensor<f64>, target: &[usize]) -> TensorResult<Tensor<f64>> {
    if grad.shape().dims() == target {
        return Ok(grad);
    }
    if target.iter().product::<usize>() == 1 {
        return Tensor::new(vec![grad.sum_all()], target.to_vec());
    }

    let mut result = grad;
    while result.ndim() > target.len() {
        result = result.sum_axis(0)?;
    }
    let current = result.shape_vec();
    for (axis, (&have, &want)) in current.iter().zip(target.iter()).enumerate() {
        if want == 1 && have > 1 {
            result = result.sum_axis(axis)?.unsqueeze(axis)?;
        }
    }
    result.reshape(target.to_vec())
}
