//! Weekly promotion uplift pipeline.
//!
//! A run registers the week's promotion upload into the cumulative table,
//! prepares per-type extracts with analog counts, builds model features and
//! scores them with one pre-fitted demand model per promotion type. Every
//! stage reads its inputs from and writes its outputs to a [`BlobStore`].

pub mod artifacts;
pub mod bundle;
pub mod components;
pub mod config;
pub mod error;
pub mod models;
pub mod pipelines;
pub mod promo_loader;
pub mod records;
pub mod rules;
pub mod stage;
pub mod storage;
pub mod table;
pub mod types;
pub mod util;

pub use artifacts::ArtifactKind;
pub use config::{PipelineConfig, StorageConfig};
pub use error::{PipelineError, PipelineResult};
pub use models::{ModelRegistry, FEATURE_COLUMNS};
pub use pipelines::uplift_run::{RunArtifacts, UpliftPipeline};
pub use stage::{RunContext, Stage, StageKind};
pub use storage::{BlobStore, LocalDirStore, MemoryStore, StorageError};
pub use types::{PromoTag, PromoType, WeekTag};
