pub mod feature_builder;
pub mod predictor;
pub mod preparer;
pub mod registrar;
