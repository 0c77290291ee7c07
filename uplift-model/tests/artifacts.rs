//! Artifact loading tests for uplift-model.
//!
//! Validates that:
//! 1. Both artifact kinds load from their JSON form
//! 2. Structurally broken artifacts are rejected at load time
//! 3. Feature-order checks catch models fitted on a different layout

use uplift_model::{load_model, DemandModel, ModelError};

const FEATURES: [&str; 3] = ["category_group", "big_demand", "demand_daily_before"];

const TREE_JSON: &str = r#"{
    "kind": "tree_ensemble",
    "feature_names": ["category_group", "big_demand", "demand_daily_before"],
    "base_score": 0.5,
    "trees": [
        {"nodes": [
            {"split": {"feature": 2, "threshold": 20.0, "left": 1, "right": 2, "default_left": true}},
            {"leaf": 4},
            {"leaf": 30.5}
        ]},
        {"nodes": [{"leaf": 1.0}]}
    ]
}"#;

const LINEAR_JSON: &str = r#"{
    "kind": "linear",
    "feature_names": ["category_group", "big_demand", "demand_daily_before"],
    "intercept": 1.0,
    "coefficients": [0.0, 5.0, 1.5]
}"#;

#[test]
fn tree_ensemble_artifact_loads_and_predicts() {
    let model = load_model(TREE_JSON.as_bytes()).unwrap();
    model.ensure_feature_order(&FEATURES).unwrap();
    assert_eq!(model.predict_one(&[1.0, 0.0, 10.0]).unwrap(), 5.5);
    assert_eq!(model.predict_one(&[1.0, 0.0, 25.0]).unwrap(), 32.0);
    // missing demand goes down the default (left) branch
    assert_eq!(model.predict_one(&[1.0, 0.0, f64::NAN]).unwrap(), 5.5);
    assert_eq!(model.name(), "TreeEnsemble");
}

#[test]
fn linear_artifact_loads_and_predicts() {
    let model = load_model(LINEAR_JSON.as_bytes()).unwrap();
    let preds = model
        .predict(&[vec![3.0, 1.0, 2.0], vec![3.0, 0.0, 0.0]])
        .unwrap();
    assert_eq!(preds, vec![9.0, 1.0]);
}

#[test]
fn unknown_kind_is_rejected() {
    let json = r#"{"kind": "neural_net", "feature_names": []}"#;
    assert!(matches!(
        load_model(json.as_bytes()),
        Err(ModelError::Serialization(_))
    ));
}

#[test]
fn dangling_child_is_rejected() {
    let json = r#"{
        "kind": "tree_ensemble",
        "feature_names": ["a"],
        "trees": [{"nodes": [{"split": {"feature": 0, "threshold": 1.0, "left": 1, "right": 7}}, {"leaf": 1.0}]}]
    }"#;
    assert!(matches!(
        load_model(json.as_bytes()),
        Err(ModelError::InvalidArtifact(_))
    ));
}

#[test]
fn feature_order_mismatch_is_reported() {
    let model = load_model(LINEAR_JSON.as_bytes()).unwrap();
    let err = model
        .ensure_feature_order(&["big_demand", "category_group", "demand_daily_before"])
        .unwrap_err();
    assert!(matches!(err, ModelError::FeatureOrder { .. }));
}
