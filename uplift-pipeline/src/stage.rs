use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::artifacts::ArtifactKind;
use crate::error::{PipelineError, PipelineResult};
use crate::storage::BlobStore;
use crate::table::{write_records, Columns, Table};
use crate::types::WeekTag;
use crate::util;

/// The four pipeline stages, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    Register,
    Prepare,
    Preprocess,
    Predict,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Register,
        StageKind::Prepare,
        StageKind::Preprocess,
        StageKind::Predict,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Register => "register",
            StageKind::Prepare => "prepare",
            StageKind::Preprocess => "preprocess",
            StageKind::Predict => "predict",
        }
    }
}

impl FromStr for StageKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::Configuration(format!("unknown stage '{}'", s)))
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything one run needs, passed explicitly to each stage.
///
/// Stages exchange data only through storage, so any stage can be rerun on
/// its own against the artifacts a previous run left behind.
pub struct RunContext {
    pub week: WeekTag,
    store: Arc<dyn BlobStore>,
    written: Vec<String>,
}

impl RunContext {
    pub fn new(week: WeekTag, store: Arc<dyn BlobStore>) -> Self {
        Self {
            week,
            store,
            written: Vec::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Paths written during this run, in write order.
    pub fn written(&self) -> &[String] {
        &self.written
    }

    pub(crate) fn record_write(&mut self, path: String) {
        self.written.push(path);
    }

    pub async fn read(&self, kind: ArtifactKind) -> PipelineResult<Vec<u8>> {
        let path = kind.path();
        log::debug!("week={} reading {}", self.week, path);
        Ok(self.store.get_blob(&path).await?)
    }

    /// Write raw bytes and remember the path.
    pub async fn write(&mut self, kind: ArtifactKind, data: Vec<u8>) -> PipelineResult<String> {
        let path = kind.path();
        write_blob(self.store.as_ref(), &path, data).await?;
        self.record_write(path.clone());
        Ok(path)
    }

    pub async fn read_table(&self, kind: ArtifactKind) -> PipelineResult<Table> {
        let bytes = self.read(kind).await?;
        Table::from_csv(&kind.path(), &bytes)
    }
}

/// Overwrite one blob, logging failures before they propagate.
pub(crate) async fn write_blob(store: &dyn BlobStore, path: &str, data: Vec<u8>) -> PipelineResult<()> {
    let len = data.len();
    store.upload_blob(data, path).await.map_err(|e| {
        log::error!("failed to persist {}: {}", path, e);
        PipelineError::from(e)
    })?;
    log::debug!("wrote {} ({} bytes)", path, len);
    Ok(())
}

/// Serialize typed rows and write them to `kind` on `store`.
pub(crate) async fn write_rows<T: Serialize + Columns>(
    store: &dyn BlobStore,
    kind: ArtifactKind,
    rows: &[T],
) -> PipelineResult<String> {
    let path = kind.path();
    let bytes = write_records(&path, rows)?;
    write_blob(store, &path, bytes).await?;
    Ok(path)
}

/// One step of the pipeline. Stages read their inputs from storage and
/// persist their outputs back to it.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, ctx: &mut RunContext) -> PipelineResult<()>;

    /// Returns a stable name for logging.
    fn name(&self) -> &str {
        util::short_type_name(std::any::type_name::<Self>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for kind in StageKind::ALL {
            assert_eq!(kind.as_str().parse::<StageKind>().unwrap(), kind);
        }
        assert_eq!("PREPARE".parse::<StageKind>().unwrap(), StageKind::Prepare);
        assert!("train".parse::<StageKind>().is_err());
    }
}
