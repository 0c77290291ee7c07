//! Pipeline error types.
//!
//! Every stage either fully succeeds or returns one of these; nothing is
//! downgraded to a warning.

use thiserror::Error;
use uplift_model::ModelError;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("artifact '{artifact}' has unexpected shape: {reason}")]
    DataShape { artifact: String, reason: String },

    #[error("unknown promotion type: '{0}'")]
    UnknownPromoType(String),

    #[error("invalid week: {0}")]
    InvalidWeek(String),

    #[error("model failure: {0}")]
    Model(#[from] ModelError),

    #[error("bundle packaging failed: {0}")]
    Bundle(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    pub fn data_shape(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::DataShape {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
