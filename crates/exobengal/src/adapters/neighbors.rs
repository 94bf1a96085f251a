use std::sync::Arc;

use exobengal_neighbors::KNNClassifier;
use exobengal_preprocessing::{stratified_split_indices, Preprocessor, Transformer};
use tracing::info;

use super::{
    check_trainable, partition, Evaluation, ModelAdapter, Prediction, ResidentModel, ScaledModel,
    TrainingReport,
};
use crate::config::ExoConfig;
use crate::dataset::TrainingSet;
use crate::error::ExoResult;
use crate::family::ModelFamily;
use crate::features::Observation;
use crate::labels::Label;

/// Euclidean k-nearest-neighbors on standardized features.
pub struct NeighborsAdapter {
    config: ExoConfig,
    resident: ResidentModel<ScaledModel<KNNClassifier>>,
}

impl NeighborsAdapter {
    pub fn new(config: ExoConfig) -> Self {
        NeighborsAdapter {
            config,
            resident: ResidentModel::new(),
        }
    }

    fn label_for(&self, probability: f64) -> Label {
        Label::from_positive(
            self.family()
                .decision_rule()
                .is_positive(1.0 - probability, probability),
        )
    }
}

impl ModelAdapter for NeighborsAdapter {
    type Model = ScaledModel<KNNClassifier>;

    fn family(&self) -> ModelFamily {
        ModelFamily::Neighbors
    }

    fn train(&self, set: &TrainingSet) -> ExoResult<TrainingReport> {
        let family = self.family();
        let split =
            stratified_split_indices(&set.labels, self.config.split.test_ratio, self.config.split.seed);
        check_trainable(family, &split)?;
        info!(%family, train = split.train.len(), test = split.test.len(), k = self.config.neighbors.k, "training started");

        let (x_train, y_train, x_test, y_test) = partition(set, &split)?;
        let mut preprocessor = Preprocessor::new();
        let x_train = preprocessor.fit_transform(&x_train)?;
        let mut knn = KNNClassifier::new(self.config.neighbors.k);
        knn.fit(&x_train, &y_train)?;

        let mut report = TrainingReport::new(family, set, &split);
        if !y_test.is_empty() {
            let scores = knn.predict_proba(&preprocessor.transform(&x_test)?)?;
            let predicted: Vec<f64> = scores.iter().map(|&p| self.label_for(p).target()).collect();
            report.evaluation = Evaluation::compute(&y_test, &predicted, &scores)?;
        }

        let model = ScaledModel {
            model: knn,
            preprocessor,
        };
        self.persist(&model)?;
        self.resident.replace(model);
        info!(%family, "training finished");
        Ok(report)
    }

    fn persist(&self, model: &ScaledModel<KNNClassifier>) -> ExoResult<()> {
        model.save(self.family(), &self.config.paths)
    }

    fn load(&self) -> ExoResult<ScaledModel<KNNClassifier>> {
        ScaledModel::load(self.family(), &self.config.paths)
    }

    fn ensure_loaded(&self) -> ExoResult<Arc<ScaledModel<KNNClassifier>>> {
        self.resident.get_or_load(|| self.load())
    }

    fn is_loaded(&self) -> bool {
        self.resident.is_loaded()
    }

    fn predict(&self, observation: &Observation) -> ExoResult<Prediction> {
        observation.check_no_infinite()?;
        let scaled = self.ensure_loaded()?;
        let x = scaled.preprocessor.transform(&observation.to_tensor()?)?;
        let probability = scaled.model.predict_proba_row(x.data())?;
        Ok(Prediction {
            label: self.label_for(probability),
            probability,
        })
    }
}
