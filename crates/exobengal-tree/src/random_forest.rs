use exobengal_core::{Tensor, TensorError, TensorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::decision_tree::{class_labels, DecisionTreeClassifier, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Bagged ensemble of Gini trees, each split drawing `floor(sqrt(p))` features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    pub params: ForestParams,
    pub n_classes: usize,
    pub n_features: usize,
    trees: Vec<DecisionTreeClassifier>,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        RandomForestClassifier {
            params,
            n_classes: 0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    /// Trees are grown in parallel; tree `t` is seeded with `seed + t`, so the
    /// result does not depend on thread scheduling.
    pub fn fit(&mut self, x: &Tensor<f64>, y: &[f64]) -> TensorResult<()> {
        if self.params.n_estimators == 0 {
            return Err(TensorError::InvalidOperation(
                "forest needs at least one tree".to_string(),
            ));
        }
        let labels = class_labels(y)?;
        let n = labels.len();
        if n == 0 {
            return Err(TensorError::EmptyTensor);
        }
        let p = x.ncols()?;
        let n_classes = labels.iter().max().map_or(0, |&m| m + 1);
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            max_features: Some(((p as f64).sqrt() as usize).max(1)),
        };

        let seed = self.params.seed;
        let trees = (0..self.params.n_estimators)
            .into_par_iter()
            .map(|t| -> TensorResult<DecisionTreeClassifier> {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut tree = DecisionTreeClassifier::new(tree_params);
                tree.fit_rows(x, &labels, n_classes, bootstrap, &mut rng)?;
                Ok(tree)
            })
            .collect::<TensorResult<Vec<_>>>()?;

        self.trees = trees;
        self.n_classes = n_classes;
        self.n_features = p;
        Ok(())
    }

    /// Mean of the trees' leaf distributions for one observation.
    pub fn predict_proba_row(&self, row: &[f64]) -> TensorResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(TensorError::NotFitted("RandomForestClassifier"));
        }
        let mut mean = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (m, &p) in mean.iter_mut().zip(tree.predict_proba_row(row)?) {
                *m += p;
            }
        }
        let count = self.trees.len() as f64;
        mean.iter_mut().for_each(|m| *m /= count);
        Ok(mean)
    }

    pub fn predict_proba(&self, x: &Tensor<f64>) -> TensorResult<Vec<Vec<f64>>> {
        (0..x.nrows()?)
            .map(|i| self.predict_proba_row(x.row_slice(i)?))
            .collect()
    }
}
