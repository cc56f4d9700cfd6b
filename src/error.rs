//! Error types for fraudlab

use thiserror::Error;

/// Message carried by [`FraudError::UnknownModel`].
pub const UNKNOWN_MODEL_MESSAGE: &str = "Sorry, there is no such model in the database";

/// Result type alias for fraudlab operations
pub type Result<T> = std::result::Result<T, FraudError>;

/// Main error type for fraudlab
#[derive(Error, Debug)]
pub enum FraudError {
    /// The input file is missing, unreadable or malformed
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// An expected column is absent or has the wrong content
    #[error("Schema error: {0}")]
    Schema(String),

    /// The requested model identifier is not one of the known models
    #[error("Sorry, there is no such model in the database: {0}")]
    UnknownModel(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl FraudError {
    /// Shape mismatch between two lengths
    pub(crate) fn length_mismatch(what: &str, expected: usize, actual: usize) -> Self {
        FraudError::ShapeMismatch {
            expected: format!("{} length = {}", what, expected),
            actual: format!("{} length = {}", what, actual),
        }
    }
}

impl From<polars::error::PolarsError> for FraudError {
    fn from(err: polars::error::PolarsError) -> Self {
        FraudError::DataAccess(err.to_string())
    }
}

impl From<serde_json::Error> for FraudError {
    fn from(err: serde_json::Error) -> Self {
        FraudError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FraudError {
    fn from(err: ndarray::ShapeError) -> Self {
        FraudError::ShapeMismatch {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
