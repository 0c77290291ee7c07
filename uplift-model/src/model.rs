use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Output transform applied to the raw model margin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    /// Raw margin is the prediction (squared-error regression).
    #[default]
    Identity,
    /// Prediction is `exp(margin)` (Poisson / Tweedie style objectives).
    Log,
}

impl Link {
    pub fn apply(self, margin: f64) -> f64 {
        match self {
            Link::Identity => margin,
            Link::Log => margin.exp(),
        }
    }
}

/// A pre-fitted regression model mapping an ordered feature vector to a
/// predicted daily demand.
///
/// Implementations are read-only after loading and safe to share across
/// threads.
pub trait DemandModel: Send + Sync {
    /// Feature names in the order `predict_one` expects them.
    fn feature_names(&self) -> &[String];

    /// Check structural invariants. Prediction assumes a model that passed.
    fn validate(&self) -> ModelResult<()>;

    /// Predict a single row.
    fn predict_one(&self, features: &[f64]) -> ModelResult<f64>;

    /// Predict a batch of rows, preserving order.
    fn predict(&self, rows: &[Vec<f64>]) -> ModelResult<Vec<f64>> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Reject the model unless it declares exactly `expected`, in order.
    fn ensure_feature_order(&self, expected: &[&str]) -> ModelResult<()> {
        let declared = self.feature_names();
        let matches = declared.len() == expected.len()
            && declared.iter().zip(expected).all(|(d, e)| d == e);
        if matches {
            Ok(())
        } else {
            Err(ModelError::FeatureOrder {
                declared: declared.to_vec(),
                expected: expected.iter().map(|s| s.to_string()).collect(),
            })
        }
    }

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

pub(crate) fn check_width(expected: usize, features: &[f64]) -> ModelResult<()> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(ModelError::FeatureCount {
            expected,
            got: features.len(),
        })
    }
}
