use exobengal_autodiff::{backward, reset_graph, Variable};
use exobengal_core::{Tensor, TensorError, TensorResult};
use exobengal_data::{DataLoader, TensorDataset};
use exobengal_loss::{bce_loss, binary_cross_entropy};
use exobengal_optim::{Adam, Optimizer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::layers::{Dropout, Linear, ReLULayer, SigmoidLayer};
use crate::sequential::Sequential;

/// Architecture and training schedule of a binary MLP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpConfig {
    /// Widths of the ReLU hidden layers.
    pub hidden_layers: Vec<usize>,
    /// Dropout rate after each hidden layer; missing entries mean none.
    pub dropout: Vec<f64>,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        MlpConfig {
            hidden_layers: vec![64, 32, 16],
            dropout: vec![0.3, 0.3],
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Dense {
    weight: Tensor<f64>,
    bias: Tensor<f64>,
}

/// Loss after one pass over the training rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: Option<f64>,
}

/// Feed-forward binary classifier with a single sigmoid output.
///
/// Weights live as plain tensors so the model serializes directly; a
/// graph is only built while fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    pub config: MlpConfig,
    pub n_inputs: usize,
    layers: Vec<Dense>,
}

impl Mlp {
    pub fn new(n_inputs: usize, config: MlpConfig) -> TensorResult<Self> {
        if n_inputs == 0 || config.hidden_layers.iter().any(|&w| w == 0) {
            return Err(TensorError::InvalidOperation(
                "layer widths must be positive".to_string(),
            ));
        }
        if config.dropout.iter().any(|r| !(0.0..1.0).contains(r)) {
            return Err(TensorError::InvalidOperation(
                "dropout rates must be in [0, 1)".to_string(),
            ));
        }

        let mut widths = vec![n_inputs];
        widths.extend(&config.hidden_layers);
        widths.push(1);

        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                let (weight, bias) = Linear::glorot(w[0], w[1], config.seed.wrapping_add(i as u64));
                Dense { weight, bias }
            })
            .collect();

        Ok(Mlp {
            config,
            n_inputs,
            layers,
        })
    }

    /// Train on `x` `[n, n_inputs]` against 0/1 labels `y` `[n]`.
    pub fn fit(
        &mut self,
        x: &Tensor<f64>,
        y: &Tensor<f64>,
        validation: Option<(&Tensor<f64>, &Tensor<f64>)>,
    ) -> TensorResult<Vec<EpochStats>> {
        self.check_inputs(x)?;
        let dataset = TensorDataset::new(x.clone(), y.clone())?;
        if dataset.labels.numel() == 0 {
            return Err(TensorError::EmptyTensor);
        }

        let mut params: Vec<Tensor<f64>> = self
            .layers
            .iter()
            .flat_map(|d| [d.weight.clone(), d.bias.clone()])
            .collect();
        let mut adam = Adam::new(&params, self.config.learning_rate);
        let mut mask_rng = StdRng::seed_from_u64(self.config.seed ^ 0x5eed);
        let mut history = Vec::with_capacity(self.config.epochs);

        for epoch in 0..self.config.epochs {
            let shuffle_seed = self.config.seed.wrapping_add(epoch as u64);
            let loader = DataLoader::new(&dataset, self.config.batch_size, Some(shuffle_seed));

            let mut loss_sum = 0.0;
            let mut rows_seen = 0usize;
            for batch in loader {
                let (xb, yb) = batch?;
                let rows = yb.numel();

                reset_graph();
                let net = self.network(&params, &mut mask_rng)?;
                let pred = net.forward(&Variable::input(xb))?;
                let target = Variable::input(yb.reshape(vec![rows, 1])?);
                let loss = bce_loss(&pred, &target)?;

                let grads = backward(&loss)?;
                let grads: Vec<Tensor<f64>> = net.parameters().iter().map(|p| grads.wrt(p)).collect();
                adam.step(&mut params, &grads)?;

                loss_sum += loss.data.item()? * rows as f64;
                rows_seen += rows;
            }
            reset_graph();

            self.store(&params);
            let train_loss = loss_sum / rows_seen as f64;
            let val_loss = match validation {
                Some((vx, vy)) if vy.numel() > 0 => {
                    let probs = Tensor::from_slice(&self.predict_proba(vx)?);
                    Some(binary_cross_entropy(&probs, vy)?)
                }
                _ => None,
            };
            debug!(epoch = epoch + 1, train_loss, ?val_loss, "epoch finished");
            history.push(EpochStats {
                epoch: epoch + 1,
                train_loss,
                val_loss,
            });
        }

        if let Some(last) = history.last() {
            info!(
                epochs = self.config.epochs,
                train_loss = last.train_loss,
                val_loss = ?last.val_loss,
                "mlp training finished"
            );
        }
        Ok(history)
    }

    /// Probability of the positive class for each row. No graph is recorded.
    pub fn predict_proba(&self, x: &Tensor<f64>) -> TensorResult<Vec<f64>> {
        self.check_inputs(x)?;
        let last = self.layers.len() - 1;
        let mut h = x.clone();
        for (i, dense) in self.layers.iter().enumerate() {
            h = h.matmul(&dense.weight)?.add(&dense.bias)?;
            h = if i < last { h.relu() } else { h.sigmoid() };
        }
        Ok(h.into_data())
    }

    fn check_inputs(&self, x: &Tensor<f64>) -> TensorResult<()> {
        let cols = x.ncols()?;
        if cols != self.n_inputs {
            return Err(TensorError::DimensionMismatch(format!(
                "network expects {} features, got {}",
                self.n_inputs, cols
            )));
        }
        Ok(())
    }

    /// Training-mode network over `params` (weight, bias pairs).
    fn network(&self, params: &[Tensor<f64>], mask_rng: &mut StdRng) -> TensorResult<Sequential> {
        let last = self.layers.len() - 1;
        let mut net = Sequential::new();
        for (i, pair) in params.chunks(2).enumerate() {
            net = net.add(Box::new(Linear::from_tensors(pair[0].clone(), pair[1].clone())?));
            if i == last {
                net = net.add(Box::new(SigmoidLayer));
                continue;
            }
            net = net.add(Box::new(ReLULayer));
            let rate = self.config.dropout.get(i).copied().unwrap_or(0.0);
            if rate > 0.0 {
                let mut dropout = Dropout::new(rate, mask_rng.gen())?;
                dropout.train();
                net = net.add(Box::new(dropout));
            }
        }
        Ok(net)
    }

    fn store(&mut self, params: &[Tensor<f64>]) {
        for (dense, pair) in self.layers.iter_mut().zip(params.chunks(2)) {
            dense.weight = pair[0].clone();
            dense.bias = pair[1].clone();
        }
    }
}
