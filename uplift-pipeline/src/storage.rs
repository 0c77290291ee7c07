//! Storage gateway.
//!
//! The pipeline only needs path-addressed reads and overwriting writes.
//! Paths are produced by [`crate::artifacts::ArtifactKind`]; the stores here
//! do not interpret them beyond validation.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::util;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("invalid blob path: '{0}'")]
    InvalidPath(String),

    #[error("storage I/O failure at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Path-addressed blob storage with overwrite semantics.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the whole blob at `path`.
    async fn get_blob(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write `data` to `path`, replacing any previous content.
    async fn upload_blob(&self, data: Vec<u8>, path: &str) -> Result<(), StorageError>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

fn validate_path(path: &str) -> Result<(), StorageError> {
    let p = Path::new(path);
    let clean = !path.is_empty()
        && p.components().all(|c| matches!(c, Component::Normal(_)));
    if clean {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Used by tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored paths, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get_blob(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        validate_path(path)?;
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload_blob(&self, data: Vec<u8>, path: &str) -> Result<(), StorageError> {
        validate_path(path)?;
        self.blobs.write().await.insert(path.to_string(), data);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Directory-backed store
// ---------------------------------------------------------------------------

/// Stores blobs as files under `<root>/<container>/<path>`.
pub struct LocalDirStore {
    base: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl AsRef<Path>, container: &str) -> Self {
        Self {
            base: root.as_ref().join(container),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        validate_path(path)?;
        Ok(self.base.join(path))
    }
}

#[async_trait]
impl BlobStore for LocalDirStore {
    async fn get_blob(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(source) => {
                log::error!("blob read failed path={} error={}", path, source);
                Err(StorageError::Io {
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    async fn upload_blob(&self, data: Vec<u8>, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        let io_err = |source| StorageError::Io {
            path: path.to_string(),
            source,
        };
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&full, data).await.map_err(|source| {
            log::error!("blob write failed path={} error={}", path, source);
            io_err(source)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_overwrites() {
        let store = MemoryStore::new();
        store.upload_blob(b"one".to_vec(), "a/b.csv").await.unwrap();
        store.upload_blob(b"two".to_vec(), "a/b.csv").await.unwrap();
        assert_eq!(store.get_blob("a/b.csv").await.unwrap(), b"two");
        assert_eq!(store.paths().await, vec!["a/b.csv".to_string()]);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_blob("nope.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn escaping_paths_are_rejected() {
        let store = MemoryStore::new();
        for bad in ["", "../x.csv", "/etc/passwd", "a/../../b"] {
            assert!(
                matches!(
                    store.upload_blob(Vec::new(), bad).await,
                    Err(StorageError::InvalidPath(_))
                ),
                "path {:?} should be rejected",
                bad
            );
        }
    }

    #[tokio::test]
    async fn local_store_round_trips_nested_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path(), "ml_promo");
        store
            .upload_blob(b"h1,h2\n".to_vec(), "source_files/pim_table.csv")
            .await
            .unwrap();
        assert!(dir.path().join("ml_promo/source_files/pim_table.csv").exists());
        assert_eq!(
            store.get_blob("source_files/pim_table.csv").await.unwrap(),
            b"h1,h2\n"
        );
        assert!(matches!(
            store.get_blob("source_files/other.csv").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
