use std::sync::Arc;

use exobengal_preprocessing::{split_indices, SimpleImputer, Transformer};
use exobengal_tree::{GridSearchCv, RandomForestClassifier};
use tracing::info;

use super::{check_trainable, partition, Evaluation, ModelAdapter, Prediction, ResidentModel, TrainingReport};
use crate::config::ExoConfig;
use crate::dataset::TrainingSet;
use crate::error::{ExoError, ExoResult};
use crate::family::ModelFamily;
use crate::features::Observation;
use crate::labels::Label;

/// Random forest on unscaled features, tuned by cross-validated grid search.
pub struct ForestAdapter {
    config: ExoConfig,
    resident: ResidentModel<RandomForestClassifier>,
}

impl ForestAdapter {
    pub fn new(config: ExoConfig) -> Self {
        ForestAdapter {
            config,
            resident: ResidentModel::new(),
        }
    }
}

/// `[P(negative), P(positive)]`, with a missing class read as zero.
fn class_pair(proba: &[f64]) -> (f64, f64) {
    (
        proba.first().copied().unwrap_or(0.0),
        proba.get(1).copied().unwrap_or(0.0),
    )
}

impl ModelAdapter for ForestAdapter {
    type Model = RandomForestClassifier;

    fn family(&self) -> ModelFamily {
        ModelFamily::Forest
    }

    fn train(&self, set: &TrainingSet) -> ExoResult<TrainingReport> {
        let family = self.family();
        let seed = self.config.split.seed;
        let split = split_indices(set.len(), self.config.split.test_ratio, seed);
        check_trainable(family, &split)?;
        info!(%family, train = split.train.len(), test = split.test.len(), "training started");

        let (x_train, y_train, x_test, y_test) = partition(set, &split)?;
        let mut imputer = SimpleImputer::new();
        let x_train = imputer.fit_transform(&x_train)?;

        let search = GridSearchCv::new(self.config.forest.grid(), self.config.forest.cv_folds, seed)
            .search(&x_train, &y_train)?;
        let mut forest = RandomForestClassifier::new(search.best_params);
        forest.fit(&x_train, &y_train)?;

        let mut report = TrainingReport::new(family, set, &split);
        report.best_params = Some(search.best_params);
        report.cv_score = search.best_score;
        if !y_test.is_empty() {
            let rule = family.decision_rule();
            let proba = forest.predict_proba(&imputer.transform(&x_test)?)?;
            let (predicted, scores): (Vec<f64>, Vec<f64>) = proba
                .iter()
                .map(|p| {
                    let (neg, pos) = class_pair(p);
                    (Label::from_positive(rule.is_positive(neg, pos)).target(), pos)
                })
                .unzip();
            report.evaluation = Evaluation::compute(&y_test, &predicted, &scores)?;
        }

        self.persist(&forest)?;
        self.resident.replace(forest);
        info!(%family, cv_score = ?report.cv_score, "training finished");
        Ok(report)
    }

    fn persist(&self, model: &RandomForestClassifier) -> ExoResult<()> {
        let path = self.config.paths.model_path(self.family());
        exobengal_io::save_json(model, &path)?;
        info!(family = %self.family(), path = %path.display(), "model saved");
        Ok(())
    }

    fn load(&self) -> ExoResult<RandomForestClassifier> {
        let path = self.config.paths.model_path(self.family());
        let model = exobengal_io::load_json(&path)
            .map_err(|e| ExoError::from_artifact(self.family(), e))?;
        info!(family = %self.family(), path = %path.display(), "model loaded");
        Ok(model)
    }

    fn ensure_loaded(&self) -> ExoResult<Arc<RandomForestClassifier>> {
        self.resident.get_or_load(|| self.load())
    }

    fn is_loaded(&self) -> bool {
        self.resident.is_loaded()
    }

    fn predict(&self, observation: &Observation) -> ExoResult<Prediction> {
        if !observation.is_finite() {
            return Err(ExoError::InvalidInput(
                "forest prediction needs every feature to be a finite number".to_string(),
            ));
        }
        let forest = self.ensure_loaded()?;
        let proba = forest.predict_proba_row(observation.as_slice())?;
        let (neg, pos) = class_pair(&proba);
        Ok(Prediction {
            label: Label::from_positive(self.family().decision_rule().is_positive(neg, pos)),
            probability: pos,
        })
    }
}
