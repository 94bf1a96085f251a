use exobengal_core::{Tensor, TensorError, TensorResult};
use serde::{Deserialize, Serialize};

use crate::scaler::{SimpleImputer, StandardScaler, Transformer};

/// Fitted parameters of a [`Preprocessor`], as persisted next to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub imputer_means: Vec<f64>,
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Mean imputation followed by standardization.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    imputer: SimpleImputer,
    scaler: StandardScaler,
}

impl Preprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a fitted preprocessor from persisted state.
    pub fn from_state(state: ScalerState) -> TensorResult<Self> {
        let width = state.imputer_means.len();
        if state.mean.len() != width || state.scale.len() != width {
            return Err(TensorError::DimensionMismatch(format!(
                "scaler state widths differ: {} means, {} centers, {} scales",
                width,
                state.mean.len(),
                state.scale.len()
            )));
        }
        Ok(Preprocessor {
            imputer: SimpleImputer::from_means(state.imputer_means),
            scaler: StandardScaler::from_parts(state.mean, state.scale),
        })
    }

    pub fn is_fitted(&self) -> bool {
        self.imputer.means.is_some() && self.scaler.mean.is_some()
    }

    /// Snapshot of the fitted parameters.
    pub fn state(&self) -> TensorResult<ScalerState> {
        match (&self.imputer.means, &self.scaler.mean, &self.scaler.scale) {
            (Some(imputer_means), Some(mean), Some(scale)) => Ok(ScalerState {
                imputer_means: imputer_means.clone(),
                mean: mean.clone(),
                scale: scale.clone(),
            }),
            _ => Err(TensorError::NotFitted("Preprocessor")),
        }
    }
}

impl Transformer for Preprocessor {
    fn fit(&mut self, x: &Tensor<f64>) -> TensorResult<()> {
        let imputed = self.imputer.fit_transform(x)?;
        self.scaler.fit(&imputed)
    }

    fn transform(&self, x: &Tensor<f64>) -> TensorResult<Tensor<f64>> {
        if !self.is_fitted() {
            return Err(TensorError::NotFitted("Preprocessor"));
        }
        self.scaler.transform(&self.imputer.transform(x)?)
    }
}
