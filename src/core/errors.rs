// src/core/errors.rs
use thiserror::Error;

/// Every failure the engine can report. None of these are recoverable at the
/// point of detection; they are handed to the caller as-is.
#[derive(Debug, Error)]
pub enum ShapError {
    /// An artifact (preprocessor statistics, ensemble, explainer input) is not fitted or loaded.
    #[error("Not Ready: {0}")]
    NotReady(String),
    /// The input record lacks a required feature key.
    #[error("Schema Mismatch: {0}")]
    SchemaMismatch(String),
    /// A tree or artifact set violates its structural invariants.
    #[error("Malformed Model: {0}")]
    MalformedModel(String),
    /// A fitted statistic makes standardization undefined.
    #[error("Numeric Degeneracy: {0}")]
    NumericDegeneracy(String),
    #[error("Incompatible Dimensions: {0}")]
    IncompatibleDimensions(String),
    /// Attributions plus base value drifted from the model margin.
    #[error("Additivity Violation: {0}")]
    AdditivityViolation(String),
    #[error("Ndarray Error: {0}")]
    NdarrayError(String),
}

impl From<ndarray::ShapeError> for ShapError {
    fn from(err: ndarray::ShapeError) -> Self {
        ShapError::NdarrayError(format!("ndarray ShapeError: {}", err))
    }
}

// Convenience type alias for Result
pub type Result<T> = std::result::Result<T, ShapError>;
