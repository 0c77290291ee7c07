pub mod artifact;
pub mod error;
pub mod linear;
pub mod model;
pub mod tree_ensemble;

pub use artifact::{load_model, ModelArtifact};
pub use error::{ModelError, ModelResult};
pub use linear::LinearModel;
pub use model::{DemandModel, Link};
pub use tree_ensemble::{Node, Tree, TreeEnsemble};
