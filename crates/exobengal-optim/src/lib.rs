use exobengal_core::{Tensor, TensorError, TensorResult};

/// Updates a fixed, ordered list of parameter tensors in place.
pub trait Optimizer {
    /// Apply one update. `grads[i]` is the gradient of `params[i]`.
    fn step(&mut self, params: &mut [Tensor<f64>], grads: &[Tensor<f64>]) -> TensorResult<()>;
}

/// Adam with bias-corrected first and second moments.
pub struct Adam {
    pub lr: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    pub t: usize,
    m: Vec<Tensor<f64>>,
    v: Vec<Tensor<f64>>,
}

impl Adam {
    /// Moments are sized from `params`, which must be the same list later
    /// passed to [`Optimizer::step`].
    pub fn new(params: &[Tensor<f64>], lr: f64) -> Self {
        Adam {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
            t: 0,
            m: params.iter().map(|p| Tensor::zeros(p.shape_vec())).collect(),
            v: params.iter().map(|p| Tensor::zeros(p.shape_vec())).collect(),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor<f64>], grads: &[Tensor<f64>]) -> TensorResult<()> {
        if params.len() != self.m.len() || grads.len() != self.m.len() {
            return Err(TensorError::DimensionMismatch(format!(
                "adam tracks {} parameters, got {} params and {} grads",
                self.m.len(),
                params.len(),
                grads.len()
            )));
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for (i, grad) in grads.iter().enumerate() {
            self.m[i] = self.m[i]
                .mul_scalar(self.beta1)
                .add(&grad.mul_scalar(1.0 - self.beta1))?;
            self.v[i] = self.v[i]
                .mul_scalar(self.beta2)
                .add(&grad.mul(grad)?.mul_scalar(1.0 - self.beta2))?;

            let m_hat = self.m[i].mul_scalar(1.0 / bias_correction1);
            let v_hat = self.v[i].mul_scalar(1.0 / bias_correction2);
            let update = m_hat
                .div(&v_hat.sqrt().add_scalar(self.epsilon))?
                .mul_scalar(self.lr);
            params[i] = params[i].sub(&update)?;
        }
        Ok(())
    }
}
