use thiserror::Error;

/// Errors raised by tensor arithmetic and by the estimators built on it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TensorError {
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("index {index} out of bounds for axis {axis} of size {size}")]
    IndexOutOfBounds { index: usize, axis: usize, size: usize },

    #[error("axis {axis} does not exist in a {ndim}-d tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("shapes {a:?} and {b:?} do not broadcast")]
    BroadcastError { a: Vec<usize>, b: Vec<usize> },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// `transform` or `predict` was called before `fit`.
    #[error("{0} is not fitted")]
    NotFitted(&'static str),

    #[error("empty input")]
    EmptyTensor,
}

pub type TensorResult<T> = Result<T, TensorError>;
