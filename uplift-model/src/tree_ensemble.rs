//! Gradient-boosted regression tree ensembles.
//!
//! Trees are stored as flat node arrays. Node 0 is the root and every split
//! points strictly forward, which keeps evaluation loop-free without a
//! separate cycle check.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::{check_width, DemandModel, Link};

/// A single tree node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Go to `left` when `x[feature] < threshold`, else `right`.
    /// NaN inputs follow `default_left`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        default_left: bool,
    },
    Leaf(f64),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    fn validate(&self, index: usize, n_features: usize) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::InvalidArtifact(format!("tree {} has no nodes", index)));
        }
        for (pos, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                left,
                right,
                ..
            } = *node
            {
                if feature >= n_features {
                    return Err(ModelError::InvalidArtifact(format!(
                        "tree {} node {} splits on feature {} of {}",
                        index, pos, feature, n_features
                    )));
                }
                for child in [left, right] {
                    if child <= pos || child >= self.nodes.len() {
                        return Err(ModelError::InvalidArtifact(format!(
                            "tree {} node {} has out-of-order child {}",
                            index, pos, child
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut pos = 0;
        loop {
            match self.nodes[pos] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let x = features[feature];
                    pos = if x.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if x < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// Additive tree ensemble: `link(base_score + sum(tree leaves))`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub base_score: f64,
    #[serde(default)]
    pub link: Link,
    pub trees: Vec<Tree>,
}

impl DemandModel for TreeEnsemble {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn validate(&self) -> ModelResult<()> {
        if self.feature_names.is_empty() {
            return Err(ModelError::InvalidArtifact(
                "tree ensemble declares no features".into(),
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.feature_names.len())?;
        }
        Ok(())
    }

    fn predict_one(&self, features: &[f64]) -> ModelResult<f64> {
        check_width(self.feature_names.len(), features)?;
        let margin = self
            .trees
            .iter()
            .fold(self.base_score, |acc, tree| acc + tree.leaf_value(features));
        Ok(self.link.apply(margin))
    }

    fn predict(&self, rows: &[Vec<f64>]) -> ModelResult<Vec<f64>> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree {
            nodes: vec![
                Node::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                    default_left: false,
                },
                Node::Leaf(low),
                Node::Leaf(high),
            ],
        }
    }

    fn ensemble() -> TreeEnsemble {
        TreeEnsemble {
            feature_names: vec!["a".into(), "b".into()],
            base_score: 1.0,
            link: Link::Identity,
            trees: vec![stump(0, 5.0, 1.0, 10.0), stump(1, 0.5, 0.0, 2.0)],
        }
    }

    #[test]
    fn sums_leaves_on_top_of_base_score() {
        let model = ensemble();
        model.validate().unwrap();
        assert_eq!(model.predict_one(&[1.0, 0.0]).unwrap(), 2.0);
        assert_eq!(model.predict_one(&[7.0, 1.0]).unwrap(), 13.0);
    }

    #[test]
    fn threshold_is_exclusive_on_the_left() {
        let model = ensemble();
        // x == threshold goes right
        assert_eq!(model.predict_one(&[5.0, 0.0]).unwrap(), 11.0);
    }

    #[test]
    fn nan_follows_default_branch() {
        let mut model = ensemble();
        assert_eq!(model.predict_one(&[f64::NAN, 0.0]).unwrap(), 11.0);
        if let Node::Split { default_left, .. } = &mut model.trees[0].nodes[0] {
            *default_left = true;
        }
        assert_eq!(model.predict_one(&[f64::NAN, 0.0]).unwrap(), 2.0);
    }

    #[test]
    fn log_link_exponentiates_margin() {
        let mut model = ensemble();
        model.base_score = 0.0;
        model.link = Link::Log;
        let got = model.predict_one(&[1.0, 0.0]).unwrap();
        assert!((got - 1f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_width() {
        let err = ensemble().predict_one(&[1.0]).unwrap_err();
        assert!(matches!(err, ModelError::FeatureCount { expected: 2, got: 1 }));
    }

    #[test]
    fn rejects_backward_children() {
        let mut model = ensemble();
        model.trees[0].nodes[0] = Node::Split {
            feature: 0,
            threshold: 1.0,
            left: 0,
            right: 2,
            default_left: false,
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn rejects_unknown_feature_index() {
        let mut model = ensemble();
        model.trees.push(stump(2, 1.0, 0.0, 1.0));
        assert!(model.validate().is_err());
    }

    #[test]
    fn batch_matches_single_predictions() {
        let model = ensemble();
        let rows = vec![vec![1.0, 0.0], vec![7.0, 1.0], vec![f64::NAN, 3.0]];
        let batch = model.predict(&rows).unwrap();
        for (row, got) in rows.iter().zip(batch) {
            assert_eq!(model.predict_one(row).unwrap(), got);
        }
    }
}
