use std::cell::RefCell;

use exobengal_autodiff::Variable;
use exobengal_core::{Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A differentiable stage of a network.
pub trait Layer {
    fn forward(&self, input: &Variable) -> TensorResult<Variable>;

    /// Trainable parameters, in a stable order.
    fn parameters(&self) -> Vec<Variable>;
}

/// Fully connected layer: y = xW + b.
pub struct Linear {
    pub weight: Variable,
    pub bias: Variable,
}

impl Linear {
    /// Register existing weights `[in, out]` and bias `[1, out]` as parameters.
    pub fn from_tensors(weight: Tensor<f64>, bias: Tensor<f64>) -> TensorResult<Self> {
        let out = weight.ncols()?;
        if bias.shape_vec() != vec![1, out] {
            return Err(TensorError::ShapeMismatch {
                expected: vec![1, out],
                got: bias.shape_vec(),
            });
        }
        Ok(Linear {
            weight: Variable::param(weight),
            bias: Variable::param(bias),
        })
    }

    /// Glorot-uniform weights and zero bias, reproducible from `seed`.
    pub fn glorot(in_features: usize, out_features: usize, seed: u64) -> (Tensor<f64>, Tensor<f64>) {
        let limit = (6.0 / (in_features + out_features) as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        let weight = Tensor::rand_with(vec![in_features, out_features], &mut rng)
            .mul_scalar(2.0 * limit)
            .add_scalar(-limit);
        (weight, Tensor::zeros(vec![1, out_features]))
    }
}

impl Layer for Linear {
    fn forward(&self, input: &Variable) -> TensorResult<Variable> {
        input.matmul(&self.weight)?.add(&self.bias)
    }

    fn parameters(&self) -> Vec<Variable> {
        vec![self.weight.clone(), self.bias.clone()]
    }
}

pub struct ReLULayer;

impl Layer for ReLULayer {
    fn forward(&self, input: &Variable) -> TensorResult<Variable> {
        Ok(input.relu())
    }

    fn parameters(&self) -> Vec<Variable> {
        vec![]
    }
}

pub struct SigmoidLayer;

impl Layer for SigmoidLayer {
    fn forward(&self, input: &Variable) -> TensorResult<Variable> {
        Ok(input.sigmoid())
    }

    fn parameters(&self) -> Vec<Variable> {
        vec![]
    }
}

/// Inverted dropout. Identity unless switched to training mode.
pub struct Dropout {
    pub rate: f64,
    pub training: bool,
    rng: RefCell<StdRng>,
}

impl Dropout {
    pub fn new(rate: f64, seed: u64) -> TensorResult<Self> {
        if !(0.0..1.0).contains(&rate) {
            return Err(TensorError::InvalidOperation(format!(
                "dropout rate must be in [0, 1), got {rate}"
            )));
        }
        Ok(Dropout {
            rate,
            training: false,
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        })
    }

    pub fn train(&mut self) {
        self.training = true;
    }
}

impl Layer for Dropout {
    fn forward(&self, input: &Variable) -> TensorResult<Variable> {
        if !self.training || self.rate == 0.0 {
            return Ok(input.clone());
        }
        let keep_scale = 1.0 / (1.0 - self.rate);
        let mut rng = self.rng.borrow_mut();
        let mask: Vec<f64> = (0..input.data.numel())
            .map(|_| if rng.gen::<f64>() < self.rate { 0.0 } else { keep_scale })
            .collect();
        let mask = Variable::input(Tensor::new(mask, input.shape_vec())?);
        input.mul(&mask)
    }

    fn parameters(&self) -> Vec<Variable> {
        vec![]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use exobengal_autodiff::reset_graph;

    #[test]
    fn test_linear_forward() {
        reset_graph();
        let w = Tensor::new(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![3, 2]).unwrap();
        let b = Tensor::new(vec![0.5, -0.5], vec![1, 2]).unwrap();
        let layer = Linear::from_tensors(w, b).unwrap();

        let x = Variable::input(Tensor::new(vec![1.0, 2.0, 3.0], vec![1, 3]).unwrap());
        let y = layer.forward(&x).unwrap();
        assert_eq!(y.data.data(), &[4.5, 4.5]);
        assert_eq!(layer.parameters().len(), 2);
    }

    #[test]
    fn test_linear_rejects_bad_bias() {
        reset_graph();
        let w = Tensor::<f64>::zeros(vec![3, 2]);
        assert!(Linear::from_tensors(w, Tensor::zeros(vec![1, 3])).is_err());
    }

    #[test]
    fn test_glorot_bounds_and_determinism() {
        let (w1, b) = Linear::glorot(9, 64, 3);
        let (w2, _) = Linear::glorot(9, 64, 3);
        let limit = (6.0f64 / 73.0).sqrt();
        assert_eq!(w1, w2);
        assert!(w1.data().iter().all(|v| v.abs() <= limit));
        assert_abs_diff_eq!(b.sum_all(), 0.0);
    }

    #[test]
    fn test_dropout_eval_is_identity() {
        reset_graph();
        let drop = Dropout::new(0.3, 1).unwrap();
        let x = Variable::input(Tensor::ones(vec![4, 4]));
        assert_eq!(drop.forward(&x).unwrap().data, x.data);
    }

    #[test]
    fn test_dropout_training_scales_survivors() {
        reset_graph();
        let mut drop = Dropout::new(0.5, 9).unwrap();
        drop.train();
        let x = Variable::input(Tensor::ones(vec![50, 20]));
        let y = drop.forward(&x).unwrap();
        assert!(y.data.data().iter().all(|&v| v == 0.0 || v == 2.0));
        let dropped = y.data.data().iter().filter(|&&v| v == 0.0).count();
        assert!(dropped > 300 && dropped < 700);
    }

    #[test]
    fn test_dropout_rate_validation() {
        assert!(Dropout::new(1.0, 0).is_err());
        assert!(Dropout::new(-0.1, 0).is_err());
    }
}
