use exobengal_core::{Tensor, TensorError, TensorResult};

/// Indexed collection of `(features, label)` samples.
pub trait Dataset {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather a mini-batch: features `[batch, n_features]`, labels `[batch]`.
    fn batch(&self, indices: &[usize]) -> TensorResult<(Tensor<f64>, Tensor<f64>)>;
}

/// A dataset backed by a feature matrix and a label vector.
pub struct TensorDataset {
    pub features: Tensor<f64>,
    pub labels: Tensor<f64>,
}

impl TensorDataset {
    pub fn new(features: Tensor<f64>, labels: Tensor<f64>) -> TensorResult<Self> {
        let rows = features.nrows()?;
        if rows != labels.numel() {
            return Err(TensorError::DimensionMismatch(format!(
                "{} feature rows but {} labels",
                rows,
                labels.numel()
            )));
        }
        Ok(TensorDataset { features, labels })
    }
}

impl Dataset for TensorDataset {
    fn len(&self) -> usize {
        self.labels.numel()
    }

    fn batch(&self, indices: &[usize]) -> TensorResult<(Tensor<f64>, Tensor<f64>)> {
        Ok((self.features.select_rows(indices)?, self.labels.select(indices)?))
    }
}
