use std::path::PathBuf;

use exobengal_core::TensorError;
use exobengal_io::IoError;
use thiserror::Error;

use crate::family::ModelFamily;

#[derive(Debug, Error)]
pub enum ExoError {
    #[error("no trained {family} model at {}", path.display())]
    ModelNotFound { family: ModelFamily, path: PathBuf },

    #[error("data format error: {0}")]
    DataFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model error: {0}")]
    Model(#[from] TensorError),

    #[error(transparent)]
    Io(IoError),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

pub type ExoResult<T> = Result<T, ExoError>;

impl From<IoError> for ExoError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::MissingColumns(columns) => {
                ExoError::DataFormat(format!("missing expected columns: {}", columns.join(", ")))
            }
            IoError::Csv(e) => ExoError::DataFormat(e.to_string()),
            other => ExoError::Io(other),
        }
    }
}

impl ExoError {
    /// Map a missing artifact file to [`ExoError::ModelNotFound`].
    pub(crate) fn from_artifact(family: ModelFamily, err: IoError) -> Self {
        match err {
            IoError::NotFound(path) => ExoError::ModelNotFound { family, path },
            other => other.into(),
        }
    }
}
