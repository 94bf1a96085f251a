use exobengal_core::{Tensor, TensorError, TensorResult};
use exobengal_metrics::roc_auc;
use exobengal_preprocessing::stratified_k_fold;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::random_forest::{ForestParams, RandomForestClassifier};

/// Hyperparameter values tried by [`GridSearchCv`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestGrid {
    pub n_estimators: Vec<usize>,
    pub max_depth: Vec<Option<usize>>,
    pub min_samples_split: Vec<usize>,
}

impl Default for ForestGrid {
    fn default() -> Self {
        ForestGrid {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![None, Some(10), Some(20)],
            min_samples_split: vec![2, 5, 10],
        }
    }
}

impl ForestGrid {
    /// Cartesian product, `n_estimators` varying slowest.
    pub fn candidates(&self, seed: u64) -> Vec<ForestParams> {
        let mut out = Vec::new();
        for &n_estimators in &self.n_estimators {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    out.push(ForestParams {
                        n_estimators,
                        max_depth,
                        min_samples_split,
                        seed,
                    });
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: ForestParams,
    /// Mean validation ROC AUC of `best_params`; `None` when cross-validation
    /// was skipped.
    pub best_score: Option<f64>,
    pub scores: Vec<(ForestParams, f64)>,
}

/// Exhaustive search scored by stratified k-fold ROC AUC.
#[derive(Debug, Clone)]
pub struct GridSearchCv {
    pub grid: ForestGrid,
    pub folds: usize,
    pub seed: u64,
}

impl GridSearchCv {
    pub fn new(grid: ForestGrid, folds: usize, seed: u64) -> Self {
        GridSearchCv { grid, folds, seed }
    }

    /// Too few rows per class for `folds` folds makes the first grid point win
    /// without scoring.
    pub fn search(&self, x: &Tensor<f64>, y: &[f64]) -> TensorResult<GridSearchResult> {
        let candidates = self.grid.candidates(self.seed);
        let first = *candidates.first().ok_or_else(|| {
            TensorError::InvalidOperation("parameter grid is empty".to_string())
        })?;

        let folds = match stratified_k_fold(y, self.folds, self.seed) {
            Ok(folds) => folds,
            Err(e) => {
                warn!(error = %e, "skipping cross-validation, using first grid point");
                return Ok(GridSearchResult {
                    best_params: first,
                    best_score: None,
                    scores: Vec::new(),
                });
            }
        };

        let scores = candidates
            .par_iter()
            .map(|params| -> TensorResult<(ForestParams, f64)> {
                let mut total = 0.0;
                for fold in &folds {
                    let y_train: Vec<f64> = fold.train.iter().map(|&i| y[i]).collect();
                    let y_valid: Vec<f64> = fold.test.iter().map(|&i| y[i]).collect();

                    let mut forest = RandomForestClassifier::new(*params);
                    forest.fit(&x.select_rows(&fold.train)?, &y_train)?;
                    let positive: Vec<f64> = forest
                        .predict_proba(&x.select_rows(&fold.test)?)?
                        .iter()
                        .map(|p| p.get(1).copied().unwrap_or(0.0))
                        .collect();
                    total += roc_auc(&y_valid, &positive)?;
                }
                let score = total / folds.len() as f64;
                debug!(?params, score, "grid point scored");
                Ok((*params, score))
            })
            .collect::<TensorResult<Vec<_>>>()?;

        let (best_params, best_score) = scores.iter().fold((first, f64::NEG_INFINITY), |best, &(p, s)| {
            if s > best.1 {
                (p, s)
            } else {
                best
            }
        });
        info!(
            candidates = scores.len(),
            folds = self.folds,
            best_score,
            ?best_params,
            "grid search finished"
        );

        Ok(GridSearchResult {
            best_params,
            best_score: Some(best_score),
            scores,
        })
    }
}
