use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::{check_width, DemandModel, Link};

/// Linear regression: `link(intercept + coefficients · x)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub link: Link,
}

impl DemandModel for LinearModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn validate(&self) -> ModelResult<()> {
        if self.coefficients.len() != self.feature_names.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            )));
        }
        Ok(())
    }

    fn predict_one(&self, features: &[f64]) -> ModelResult<f64> {
        check_width(self.coefficients.len(), features)?;
        let margin = self
            .coefficients
            .iter()
            .zip(features)
            .fold(self.intercept, |acc, (w, x)| acc + w * x);
        Ok(self.link.apply(margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weighted_sum_plus_intercept() {
        let model = LinearModel {
            feature_names: vec!["x".into(), "y".into()],
            intercept: 2.0,
            coefficients: vec![0.5, -1.0],
            link: Link::Identity,
        };
        model.validate().unwrap();
        assert_eq!(model.predict_one(&[4.0, 1.0]).unwrap(), 3.0);
    }

    #[test]
    fn coefficient_count_must_match_features() {
        let model = LinearModel {
            feature_names: vec!["x".into()],
            intercept: 0.0,
            coefficients: vec![1.0, 2.0],
            link: Link::Identity,
        };
        assert!(matches!(model.validate(), Err(ModelError::InvalidArtifact(_))));
    }
}
