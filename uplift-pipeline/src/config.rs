//! Pipeline configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! file (or no file) is a valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, PipelineResult};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub storage: StorageConfig,

    /// Count a promotion row among its own analogs.
    pub analogs_include_self: bool,

    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Where the directory-backed blob store lives.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub container: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            analogs_include_self: true,
            log_level: "info".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            container: "ml_promo".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| PipelineError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.storage.container, "ml_promo");
        assert!(config.analogs_include_self);
    }

    #[test]
    fn partial_override() {
        let config = PipelineConfig::from_toml(
            r#"
analogs_include_self = false

[storage]
root = "/data"
"#,
        )
        .unwrap();
        assert!(!config.analogs_include_self);
        assert_eq!(config.storage.root, PathBuf::from("/data"));
        assert_eq!(config.storage.container, "ml_promo");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn malformed_document_is_a_configuration_error() {
        let err = PipelineConfig::from_toml("analogs_include_self = \"maybe\"").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let err = PipelineConfig::load("/nonexistent/uplift.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
