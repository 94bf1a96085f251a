//! Runtime configuration.
//!
//! Every field has a default, so an empty environment yields a working setup.
//! Values can be overridden from a TOML file and from `EXOBENGAL__*`
//! environment variables, e.g. `EXOBENGAL__SPLIT__SEED=7` or
//! `EXOBENGAL__PATHS__MODELS_DIR=/srv/models`.

use std::path::{Path, PathBuf};

use exobengal_nn::MlpConfig;
use exobengal_tree::ForestGrid;
use serde::{Deserialize, Serialize};

use crate::error::ExoResult;
use crate::family::ModelFamily;

pub const FOREST_MODEL_FILE: &str = "random_forest_classifier.json";
pub const NETWORK_MODEL_FILE: &str = "mlp_model.json";
pub const NEIGHBORS_MODEL_FILE: &str = "knn_model.json";
pub const NETWORK_SCALER_FILE: &str = "network_scaler.json";
pub const NEIGHBORS_SCALER_FILE: &str = "neighbors_scaler.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExoConfig {
    pub paths: PathsConfig,
    pub split: SplitConfig,
    pub forest: ForestConfig,
    pub network: NetworkConfig,
    pub neighbors: NeighborsConfig,
}

impl ExoConfig {
    /// Defaults, then `file` if given, then environment overrides.
    pub fn load(file: Option<&Path>) -> ExoResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("EXOBENGAL")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults with every artifact under `dir`.
    pub fn with_models_dir(dir: impl Into<PathBuf>) -> Self {
        let mut config = ExoConfig::default();
        config.paths.models_dir = dir.into();
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_file: PathBuf,
    pub models_dir: PathBuf,
    pub forest_model: Option<PathBuf>,
    pub network_model: Option<PathBuf>,
    pub neighbors_model: Option<PathBuf>,
    pub network_scaler: Option<PathBuf>,
    pub neighbors_scaler: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_file: PathBuf::from("data/cumulative.csv"),
            models_dir: PathBuf::from("models"),
            forest_model: None,
            network_model: None,
            neighbors_model: None,
            network_scaler: None,
            neighbors_scaler: None,
        }
    }
}

impl PathsConfig {
    fn resolve(&self, explicit: &Option<PathBuf>, file: &str) -> PathBuf {
        explicit.clone().unwrap_or_else(|| self.models_dir.join(file))
    }

    pub fn model_path(&self, family: ModelFamily) -> PathBuf {
        match family {
            ModelFamily::Forest => self.resolve(&self.forest_model, FOREST_MODEL_FILE),
            ModelFamily::Network => self.resolve(&self.network_model, NETWORK_MODEL_FILE),
            ModelFamily::Neighbors => self.resolve(&self.neighbors_model, NEIGHBORS_MODEL_FILE),
        }
    }

    /// Scaler state file; the forest has none.
    pub fn scaler_path(&self, family: ModelFamily) -> Option<PathBuf> {
        match family {
            ModelFamily::Forest => None,
            ModelFamily::Network => Some(self.resolve(&self.network_scaler, NETWORK_SCALER_FILE)),
            ModelFamily::Neighbors => {
                Some(self.resolve(&self.neighbors_scaler, NEIGHBORS_SCALER_FILE))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        SplitConfig {
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: Vec<usize>,
    /// `0` stands for unlimited depth.
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub cv_folds: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            n_estimators: vec![50, 100, 200],
            max_depth: vec![0, 10, 20],
            min_samples_split: vec![2, 5, 10],
            cv_folds: 3,
        }
    }
}

impl ForestConfig {
    pub fn grid(&self) -> ForestGrid {
        ForestGrid {
            n_estimators: self.n_estimators.clone(),
            max_depth: self
                .max_depth
                .iter()
                .map(|&d| if d == 0 { None } else { Some(d) })
                .collect(),
            min_samples_split: self.min_samples_split.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_layers: Vec<usize>,
    /// Rate applied after each of the first `dropout_layers` hidden layers.
    pub dropout: f64,
    pub dropout_layers: usize,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_layers: vec![64, 32, 16],
            dropout: 0.3,
            dropout_layers: 2,
            epochs: 50,
            batch_size: 32,
            learning_rate: 0.001,
        }
    }
}

impl NetworkConfig {
    pub fn mlp_config(&self, seed: u64) -> MlpConfig {
        MlpConfig {
            hidden_layers: self.hidden_layers.clone(),
            dropout: vec![self.dropout; self.dropout_layers.min(self.hidden_layers.len())],
            epochs: self.epochs,
            batch_size: self.batch_size,
            learning_rate: self.learning_rate,
            seed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeighborsConfig {
    pub k: usize,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        NeighborsConfig { k: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ExoConfig::default();
        assert_eq!(config.split.test_ratio, 0.2);
        assert_eq!(config.neighbors.k, 5);
        assert_eq!(config.forest.grid(), ForestGrid::default());
        assert_eq!(config.network.mlp_config(42), MlpConfig::default());
        assert_eq!(
            config.paths.model_path(ModelFamily::Forest),
            PathBuf::from("models/random_forest_classifier.json")
        );
        assert_eq!(config.paths.scaler_path(ModelFamily::Forest), None);
        assert_ne!(
            config.paths.scaler_path(ModelFamily::Network),
            config.paths.scaler_path(ModelFamily::Neighbors)
        );
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[paths]\nmodels_dir = \"/tmp/exo\"\nforest_model = \"/tmp/rf.json\"\n\n[neighbors]\nk = 7\n\n[forest]\nmax_depth = [0, 5]"
        )
        .unwrap();

        let config = ExoConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.neighbors.k, 7);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.forest.grid().max_depth, vec![None, Some(5)]);
        assert_eq!(config.paths.model_path(ModelFamily::Forest), PathBuf::from("/tmp/rf.json"));
        assert_eq!(
            config.paths.model_path(ModelFamily::Network),
            PathBuf::from("/tmp/exo/mlp_model.json")
        );
    }

    #[test]
    fn test_missing_config_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ExoConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }
}
