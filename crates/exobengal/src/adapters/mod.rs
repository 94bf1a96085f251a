//! Per-family training and inference.
//!
//! Each adapter owns one model family end to end: it splits and preprocesses
//! a [`TrainingSet`], fits and evaluates the model, writes the artifacts and
//! keeps the model resident for prediction.

mod forest;
mod neighbors;
mod network;
mod resident;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use exobengal_core::Tensor;
use exobengal_metrics::{confusion_matrix, roc_auc, ClassificationReport};
use exobengal_preprocessing::{Preprocessor, ScalerState, SplitIndices};
use exobengal_tree::ForestParams;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::PathsConfig;
use crate::dataset::TrainingSet;
use crate::error::{ExoError, ExoResult};
use crate::family::ModelFamily;
use crate::features::Observation;
use crate::labels::Label;

pub use forest::ForestAdapter;
pub use neighbors::NeighborsAdapter;
pub use network::NetworkAdapter;
pub use resident::ResidentModel;

const CLASS_NAMES: [&str; 2] = [Label::NotPlanet.as_str(), Label::Planet.as_str()];

/// Label and positive-class probability for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    pub probability: f64,
}

/// Test-partition scores, for reporting only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub report: ClassificationReport,
    /// `confusion[true][predicted]`, class 0 is "Not a Planet".
    pub confusion: Vec<Vec<usize>>,
    pub roc_auc: f64,
}

impl Evaluation {
    /// `None` when the test partition is empty.
    pub fn compute(y_true: &[f64], y_pred: &[f64], scores: &[f64]) -> ExoResult<Option<Self>> {
        if y_true.is_empty() {
            return Ok(None);
        }
        Ok(Some(Evaluation {
            report: ClassificationReport::new(y_true, y_pred, &CLASS_NAMES)?,
            confusion: confusion_matrix(y_true, y_pred, CLASS_NAMES.len())?,
            roc_auc: roc_auc(y_true, scores)?,
        }))
    }
}

/// Outcome of one `train` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub family: ModelFamily,
    pub train_rows: usize,
    pub test_rows: usize,
    pub dropped_rows: usize,
    pub evaluation: Option<Evaluation>,
    /// Forest only: parameters picked by the grid search.
    pub best_params: Option<ForestParams>,
    /// Forest only: mean cross-validated ROC AUC of `best_params`.
    pub cv_score: Option<f64>,
    /// Network only.
    pub final_loss: Option<f64>,
}

impl TrainingReport {
    fn new(family: ModelFamily, set: &TrainingSet, split: &SplitIndices) -> Self {
        TrainingReport {
            family,
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            dropped_rows: set.dropped,
            evaluation: None,
            best_params: None,
            cv_score: None,
            final_loss: None,
        }
    }
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} model: {} train rows, {} test rows, {} rows dropped",
            self.family, self.train_rows, self.test_rows, self.dropped_rows
        )?;
        if let Some(params) = &self.best_params {
            let depth = params
                .max_depth
                .map_or_else(|| "none".to_string(), |d| d.to_string());
            write!(
                f,
                "best parameters: n_estimators={} max_depth={} min_samples_split={}",
                params.n_estimators, depth, params.min_samples_split
            )?;
            match self.cv_score {
                Some(score) => writeln!(f, " (cv roc auc {score:.4})")?,
                None => writeln!(f, " (cross-validation skipped)")?,
            }
        }
        if let Some(loss) = self.final_loss {
            writeln!(f, "final training loss: {loss:.4}")?;
        }
        match &self.evaluation {
            Some(eval) => {
                writeln!(f, "{}", eval.report)?;
                writeln!(f, "confusion matrix:")?;
                for row in &eval.confusion {
                    let cells: Vec<String> = row.iter().map(|c| format!("{c:>6}")).collect();
                    writeln!(f, "{}", cells.join(""))?;
                }
                writeln!(f, "roc auc: {:.4}", eval.roc_auc)
            }
            None => writeln!(f, "no test rows, evaluation skipped"),
        }
    }
}

/// Training and inference contract shared by the three families.
pub trait ModelAdapter {
    type Model;

    fn family(&self) -> ModelFamily;

    /// Fit on `set`, persist the artifacts and make the new model resident.
    fn train(&self, set: &TrainingSet) -> ExoResult<TrainingReport>;

    /// Write `model` and any scaler state it owns.
    fn persist(&self, model: &Self::Model) -> ExoResult<()>;

    /// Read the persisted artifacts. Does not touch the resident model.
    fn load(&self) -> ExoResult<Self::Model>;

    /// The resident model, loading it on first use.
    fn ensure_loaded(&self) -> ExoResult<Arc<Self::Model>>;

    fn is_loaded(&self) -> bool;

    fn predict(&self, observation: &Observation) -> ExoResult<Prediction>;
}

/// A model that consumes standardized features, with the preprocessor
/// fit on its own training partition.
#[derive(Debug, Clone)]
pub struct ScaledModel<M> {
    pub model: M,
    pub preprocessor: Preprocessor,
}

/// Training and test partitions of `set` as `(x_train, y_train, x_test, y_test)`.
fn partition(
    set: &TrainingSet,
    split: &SplitIndices,
) -> ExoResult<(Tensor<f64>, Vec<f64>, Tensor<f64>, Vec<f64>)> {
    let x = &set.frame.features;
    let gather = |rows: &[usize]| -> Vec<f64> { rows.iter().map(|&i| set.labels[i]).collect() };
    Ok((
        x.select_rows(&split.train)?,
        gather(&split.train),
        x.select_rows(&split.test)?,
        gather(&split.test),
    ))
}

fn check_trainable(family: ModelFamily, split: &SplitIndices) -> ExoResult<()> {
    if split.train.is_empty() {
        return Err(ExoError::DataFormat(format!(
            "no training rows left for the {family} model"
        )));
    }
    Ok(())
}

impl<M: Serialize + DeserializeOwned> ScaledModel<M> {
    fn scaler_path(family: ModelFamily, paths: &PathsConfig) -> ExoResult<PathBuf> {
        paths
            .scaler_path(family)
            .ok_or_else(|| ExoError::InvalidInput(format!("the {family} model has no scaler file")))
    }

    /// Write the model and its scaler state as two separate files.
    fn save(&self, family: ModelFamily, paths: &PathsConfig) -> ExoResult<()> {
        let model_path = paths.model_path(family);
        let scaler_path = Self::scaler_path(family, paths)?;
        exobengal_io::save_json(&self.model, &model_path)?;
        exobengal_io::save_json(&self.preprocessor.state()?, &scaler_path)?;
        info!(%family, model = %model_path.display(), scaler = %scaler_path.display(), "model saved");
        Ok(())
    }

    fn load(family: ModelFamily, paths: &PathsConfig) -> ExoResult<Self> {
        let model_path = paths.model_path(family);
        let scaler_path = Self::scaler_path(family, paths)?;
        let model = exobengal_io::load_json(&model_path)
            .map_err(|e| ExoError::from_artifact(family, e))?;
        let state: ScalerState = exobengal_io::load_json(&scaler_path)
            .map_err(|e| ExoError::from_artifact(family, e))?;
        info!(%family, model = %model_path.display(), scaler = %scaler_path.display(), "model loaded");
        Ok(ScaledModel {
            model,
            preprocessor: Preprocessor::from_state(state)?,
        })
    }
}
