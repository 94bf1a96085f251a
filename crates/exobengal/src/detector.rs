use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::{ForestAdapter, ModelAdapter, NeighborsAdapter, NetworkAdapter, Prediction, TrainingReport};
use crate::config::ExoConfig;
use crate::dataset::TrainingSet;
use crate::error::ExoResult;
use crate::esi::esi;
use crate::family::ModelFamily;
use crate::features::Observation;
use crate::labels::Label;

/// What a caller gets back for one observation.
///
/// Serializes as `{"prediction": "Planet", "probability": 0.83, "ESI": 0.912}`;
/// the `ESI` key is absent for negative predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: Label,
    pub probability: f64,
    #[serde(rename = "ESI", default, skip_serializing_if = "Option::is_none")]
    pub esi: Option<f64>,
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Prediction: {}, Probability: {:.2}", self.prediction, self.probability)?;
        if let Some(esi) = self.esi {
            write!(f, ", ESI: {esi:.3}")?;
        }
        Ok(())
    }
}

/// Entry point for training and inference across the three model families.
///
/// Models are loaded from disk on first use and stay resident afterwards.
pub struct Detector {
    config: ExoConfig,
    forest: ForestAdapter,
    network: NetworkAdapter,
    neighbors: NeighborsAdapter,
}

impl Detector {
    pub fn new(config: ExoConfig) -> Self {
        Detector {
            forest: ForestAdapter::new(config.clone()),
            network: NetworkAdapter::new(config.clone()),
            neighbors: NeighborsAdapter::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &ExoConfig {
        &self.config
    }

    pub fn is_loaded(&self, family: ModelFamily) -> bool {
        match family {
            ModelFamily::Forest => self.forest.is_loaded(),
            ModelFamily::Network => self.network.is_loaded(),
            ModelFamily::Neighbors => self.neighbors.is_loaded(),
        }
    }

    /// Classify `observation` with `family`, attaching the ESI to positives.
    pub fn predict_with(
        &self,
        family: ModelFamily,
        observation: &Observation,
    ) -> ExoResult<PredictionResult> {
        let Prediction { label, probability } = match family {
            ModelFamily::Forest => self.forest.predict(observation)?,
            ModelFamily::Network => self.network.predict(observation)?,
            ModelFamily::Neighbors => self.neighbors.predict(observation)?,
        };
        let esi = if label.is_positive() {
            Some(esi(observation.planet_radius(), observation.equilibrium_temp())?)
        } else {
            None
        };
        let result = PredictionResult {
            prediction: label,
            probability,
            esi,
        };
        info!(%family, "{result}");
        Ok(result)
    }

    pub fn random_forest(&self, values: &[f64]) -> ExoResult<PredictionResult> {
        self.predict_with(ModelFamily::Forest, &Observation::from_slice(values)?)
    }

    pub fn network(&self, values: &[f64]) -> ExoResult<PredictionResult> {
        self.predict_with(ModelFamily::Network, &Observation::from_slice(values)?)
    }

    pub fn neighbors(&self, values: &[f64]) -> ExoResult<PredictionResult> {
        self.predict_with(ModelFamily::Neighbors, &Observation::from_slice(values)?)
    }

    /// Train `family` on `data`, or on the configured data file.
    pub fn train(&self, family: ModelFamily, data: Option<&Path>) -> ExoResult<TrainingReport> {
        let set = self.load_training_set(data)?;
        self.train_on(family, &set)
    }

    /// Train every family on one read of the data file.
    pub fn train_all(&self, data: Option<&Path>) -> ExoResult<Vec<TrainingReport>> {
        let set = self.load_training_set(data)?;
        ModelFamily::ALL
            .iter()
            .map(|&family| self.train_on(family, &set))
            .collect()
    }

    pub fn train_on(&self, family: ModelFamily, set: &TrainingSet) -> ExoResult<TrainingReport> {
        let report = match family {
            ModelFamily::Forest => self.forest.train(set)?,
            ModelFamily::Network => self.network.train(set)?,
            ModelFamily::Neighbors => self.neighbors.train(set)?,
        };
        info!(%family, "evaluation\n{report}");
        Ok(report)
    }

    fn load_training_set(&self, data: Option<&Path>) -> ExoResult<TrainingSet> {
        TrainingSet::load(data.unwrap_or(self.config.paths.data_file.as_path()))
    }
}
