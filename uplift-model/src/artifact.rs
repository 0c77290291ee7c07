//! JSON model artifacts.
//!
//! An artifact is a tagged document:
//!
//! ```json
//! {"kind": "tree_ensemble", "feature_names": ["..."], "base_score": 0.0, "trees": [...]}
//! {"kind": "linear", "feature_names": ["..."], "intercept": 0.0, "coefficients": [...]}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::linear::LinearModel;
use crate::model::DemandModel;
use crate::tree_ensemble::TreeEnsemble;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    TreeEnsemble(TreeEnsemble),
    Linear(LinearModel),
}

impl ModelArtifact {
    pub fn from_json(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Validate and convert into a shareable model.
    pub fn into_model(self) -> ModelResult<Arc<dyn DemandModel>> {
        match self {
            ModelArtifact::TreeEnsemble(model) => {
                model.validate()?;
                log::debug!(
                    "loaded tree ensemble trees={} features={}",
                    model.trees.len(),
                    model.feature_names.len()
                );
                Ok(Arc::new(model))
            }
            ModelArtifact::Linear(model) => {
                model.validate()?;
                log::debug!("loaded linear model features={}", model.feature_names.len());
                Ok(Arc::new(model))
            }
        }
    }
}

/// Parse, validate and box a model artifact.
pub fn load_model(bytes: &[u8]) -> ModelResult<Arc<dyn DemandModel>> {
    ModelArtifact::from_json(bytes)?.into_model()
}
