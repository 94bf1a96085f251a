//! Exoplanet candidate classification.
//!
//! Three classifiers (random forest, MLP, k-nearest-neighbors) are trained on
//! the Kepler Objects of Interest table and served through [`Detector`],
//! which loads persisted models on first use and scores positive detections
//! with the Earth Similarity Index.

pub mod adapters;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod error;
pub mod esi;
pub mod family;
pub mod features;
pub mod labels;

pub use adapters::{
    Evaluation, ForestAdapter, ModelAdapter, NeighborsAdapter, NetworkAdapter, Prediction,
    TrainingReport,
};
pub use config::ExoConfig;
pub use dataset::TrainingSet;
pub use detector::{Detector, PredictionResult};
pub use error::{ExoError, ExoResult};
pub use esi::esi;
pub use family::{DecisionRule, ModelFamily};
pub use features::{insolation, FeatureFrame, Observation, FEATURE_COLUMNS};
pub use labels::{Disposition, Label};
