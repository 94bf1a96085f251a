use std::sync::Arc;

use exobengal_core::Tensor;
use exobengal_nn::Mlp;
use exobengal_preprocessing::{stratified_split_indices, Preprocessor, Transformer};
use tracing::info;

use super::{
    check_trainable, partition, Evaluation, ModelAdapter, Prediction, ResidentModel, ScaledModel,
    TrainingReport,
};
use crate::config::ExoConfig;
use crate::dataset::TrainingSet;
use crate::error::{ExoError, ExoResult};
use crate::family::ModelFamily;
use crate::features::{Observation, N_FEATURES};
use crate::labels::Label;

/// Cutoff used only when scoring the test partition.
const EVALUATION_CUTOFF: f64 = 0.5;

/// 0/1 targets for the test-partition report; `p >= 0.5` counts as a planet.
fn evaluation_targets(scores: &[f64]) -> Vec<f64> {
    scores
        .iter()
        .map(|&p| Label::from_positive(p >= EVALUATION_CUTOFF).target())
        .collect()
}

/// Feed-forward network on standardized features.
pub struct NetworkAdapter {
    config: ExoConfig,
    resident: ResidentModel<ScaledModel<Mlp>>,
}

impl NetworkAdapter {
    pub fn new(config: ExoConfig) -> Self {
        NetworkAdapter {
            config,
            resident: ResidentModel::new(),
        }
    }
}

impl ModelAdapter for NetworkAdapter {
    type Model = ScaledModel<Mlp>;

    fn family(&self) -> ModelFamily {
        ModelFamily::Network
    }

    fn train(&self, set: &TrainingSet) -> ExoResult<TrainingReport> {
        let family = self.family();
        let seed = self.config.split.seed;
        let split = stratified_split_indices(&set.labels, self.config.split.test_ratio, seed);
        check_trainable(family, &split)?;
        info!(%family, train = split.train.len(), test = split.test.len(), "training started");

        let (x_train, y_train, x_test, y_test) = partition(set, &split)?;
        let mut preprocessor = Preprocessor::new();
        let x_train = preprocessor.fit_transform(&x_train)?;
        let x_test = if y_test.is_empty() {
            None
        } else {
            Some(preprocessor.transform(&x_test)?)
        };
        let y_test_tensor = Tensor::from_slice(&y_test);

        let mut mlp = Mlp::new(N_FEATURES, self.config.network.mlp_config(seed))?;
        let validation = x_test.as_ref().map(|x| (x, &y_test_tensor));
        let history = mlp.fit(&x_train, &Tensor::from_slice(&y_train), validation)?;

        let mut report = TrainingReport::new(family, set, &split);
        report.final_loss = history.last().map(|e| e.train_loss);
        if let Some(x_test) = &x_test {
            let scores = mlp.predict_proba(x_test)?;
            let predicted = evaluation_targets(&scores);
            report.evaluation = Evaluation::compute(&y_test, &predicted, &scores)?;
        }

        let model = ScaledModel {
            model: mlp,
            preprocessor,
        };
        self.persist(&model)?;
        self.resident.replace(model);
        info!(%family, final_loss = ?report.final_loss, "training finished");
        Ok(report)
    }

    fn persist(&self, model: &ScaledModel<Mlp>) -> ExoResult<()> {
        model.save(self.family(), &self.config.paths)
    }

    fn load(&self) -> ExoResult<ScaledModel<Mlp>> {
        ScaledModel::load(self.family(), &self.config.paths)
    }

    fn ensure_loaded(&self) -> ExoResult<Arc<ScaledModel<Mlp>>> {
        self.resident.get_or_load(|| self.load())
    }

    fn is_loaded(&self) -> bool {
        self.resident.is_loaded()
    }

    fn predict(&self, observation: &Observation) -> ExoResult<Prediction> {
        observation.check_no_infinite()?;
        let scaled = self.ensure_loaded()?;
        let x = scaled.preprocessor.transform(&observation.to_tensor()?)?;
        let probability = scaled.model.predict_proba(&x)?.first().copied().ok_or_else(|| {
            ExoError::InvalidInput("network returned no probability".to_string())
        })?;
        Ok(Prediction {
            label: Label::from_positive(
                self.family()
                    .decision_rule()
                    .is_positive(1.0 - probability, probability),
            ),
            probability,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_cutoff_includes_half() {
        assert_eq!(evaluation_targets(&[0.5, 0.49, 0.61, 0.0]), vec![1.0, 0.0, 1.0, 0.0]);
    }
}
