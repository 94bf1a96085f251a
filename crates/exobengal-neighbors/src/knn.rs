use exobengal_core::{Tensor, TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// K-nearest-neighbors classifier over Euclidean distance.
///
/// Stores the training rows; the positive-class probability of a query is
/// the fraction of its `k` nearest rows labelled 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    pub k: usize,
    x_train: Option<Tensor<f64>>,
    y_train: Vec<f64>,
}

impl KNNClassifier {
    pub fn new(k: usize) -> Self {
        KNNClassifier {
            k,
            x_train: None,
            y_train: Vec::new(),
        }
    }

    pub fn fit(&mut self, x: &Tensor<f64>, y: &[f64]) -> TensorResult<()> {
        if self.k == 0 {
            return Err(TensorError::InvalidOperation("k must be at least 1".into()));
        }
        let rows = x.nrows()?;
        if rows != y.len() {
            return Err(TensorError::DimensionMismatch(format!(
                "{} rows but {} labels",
                rows,
                y.len()
            )));
        }
        if rows == 0 {
            return Err(TensorError::EmptyTensor);
        }
        self.x_train = Some(x.clone());
        self.y_train = y.to_vec();
        Ok(())
    }

    /// Training rows actually consulted: `k` clamped to the training size.
    pub fn effective_k(&self) -> usize {
        self.k.min(self.y_train.len())
    }

    /// Indices of the nearest training rows, closest first; ties keep row order.
    pub fn neighbors(&self, row: &[f64]) -> TensorResult<Vec<usize>> {
        let x_train = self.x_train.as_ref().ok_or(TensorError::NotFitted("KNNClassifier"))?;
        let width = x_train.ncols()?;
        if row.len() != width {
            return Err(TensorError::DimensionMismatch(format!(
                "model expects {} features, got {}",
                width,
                row.len()
            )));
        }

        let mut dists: Vec<(f64, usize)> = (0..self.y_train.len())
            .map(|j| -> TensorResult<(f64, usize)> {
                let train = x_train.row_slice(j)?;
                let sq: f64 = row.iter().zip(train).map(|(a, b)| (a - b) * (a - b)).sum();
                Ok((sq.sqrt(), j))
            })
            .collect::<TensorResult<_>>()?;
        dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        Ok(dists.into_iter().take(self.effective_k()).map(|(_, j)| j).collect())
    }

    pub fn predict_proba_row(&self, row: &[f64]) -> TensorResult<f64> {
        let nearest = self.neighbors(row)?;
        let positive = nearest.iter().filter(|&&j| self.y_train[j] == 1.0).count();
        Ok(positive as f64 / nearest.len() as f64)
    }

    pub fn predict_proba(&self, x: &Tensor<f64>) -> TensorResult<Vec<f64>> {
        (0..x.nrows()?)
            .map(|i| self.predict_proba_row(x.row_slice(i)?))
            .collect()
    }
}
