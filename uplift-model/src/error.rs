//! Model loading and evaluation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model artifact: {0}")]
    InvalidArtifact(String),

    #[error("feature vector has {got} values, model expects {expected}")]
    FeatureCount { expected: usize, got: usize },

    #[error("feature order mismatch: model declares {declared:?}, pipeline supplies {expected:?}")]
    FeatureOrder {
        declared: Vec<String>,
        expected: Vec<String>,
    },

    #[error("model artifact is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for model operations.
pub type ModelResult<T> = Result<T, ModelError>;
