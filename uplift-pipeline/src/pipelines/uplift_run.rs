use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::artifacts::ArtifactKind;
use crate::components::feature_builder::FeatureBuilder;
use crate::components::predictor::Predictor;
use crate::components::preparer::Preparer;
use crate::components::registrar::Registrar;
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::models::ModelRegistry;
use crate::stage::{write_blob, RunContext, Stage, StageKind};
use crate::storage::BlobStore;
use crate::types::{PromoType, WeekTag};

/// Artifact paths produced by one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunArtifacts {
    pub week: WeekTag,
    pub svp: String,
    pub aba: String,
    pub bundle: String,
    /// Every path written during the run, in write order.
    pub written: Vec<String>,
}

impl RunArtifacts {
    fn new(week: WeekTag, written: Vec<String>) -> Self {
        Self {
            week,
            svp: ArtifactKind::Predictions(PromoType::Svp, week).path(),
            aba: ArtifactKind::Predictions(PromoType::Aba, week).path(),
            bundle: ArtifactKind::Bundle(week).path(),
            written,
        }
    }
}

/// The weekly promotion uplift pipeline.
///
/// Pipeline flow:
/// 1. Registrar merges the week's upload into the cumulative table
/// 2. Preparer counts analogs and extracts one table per promotion type
/// 3. FeatureBuilder maps groups, buckets and the demand baseline
/// 4. Predictor scores each type with its model and bundles the results
///
/// Stages hand data to each other only through the store, so a run can be
/// resumed from any stage.
pub struct UpliftPipeline {
    store: Arc<dyn BlobStore>,
    stages: Vec<Box<dyn Stage>>,
}

impl UpliftPipeline {
    /// Create a pipeline that loads its models from `store`.
    pub fn new(store: Arc<dyn BlobStore>, config: &PipelineConfig) -> Self {
        Self::with_predictor(store, config, Predictor::from_store())
    }

    /// Create a pipeline with preloaded models.
    pub fn with_models(store: Arc<dyn BlobStore>, config: &PipelineConfig, models: ModelRegistry) -> Self {
        Self::with_predictor(store, config, Predictor::with_models(models))
    }

    fn with_predictor(store: Arc<dyn BlobStore>, config: &PipelineConfig, predictor: Predictor) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Registrar),
            Box::new(Preparer::new(config.analogs_include_self)),
            Box::new(FeatureBuilder),
            Box::new(predictor),
        ];
        Self { store, stages }
    }

    pub fn stages(&self) -> &[Box<dyn Stage>] {
        &self.stages
    }

    /// Store the raw upload for `week` and run every stage.
    pub async fn run_pipeline(&self, week: &str, raw_upload: Vec<u8>) -> PipelineResult<RunArtifacts> {
        let week: WeekTag = week.parse()?;
        // the feature builder needs two prior weeks of history
        week.previous(2)?;

        let raw = ArtifactKind::RawUpload(week).path();
        write_blob(self.store.as_ref(), &raw, raw_upload).await?;
        log::info!("week={} stored upload at {}", week, raw);

        let mut artifacts = self.resume(week, StageKind::Register).await?;
        artifacts.written.insert(0, raw);
        Ok(artifacts)
    }

    /// Run the stages from `from` onwards against artifacts already in
    /// storage.
    pub async fn resume(&self, week: WeekTag, from: StageKind) -> PipelineResult<RunArtifacts> {
        let mut ctx = RunContext::new(week, Arc::clone(&self.store));
        let started = Instant::now();
        log::info!(
            "week={} store={} starting pipeline at stage {}",
            week,
            self.store.name(),
            from
        );

        for stage in self.stages.iter().filter(|s| s.kind() >= from) {
            let stage_start = Instant::now();
            if let Err(e) = stage.run(&mut ctx).await {
                log::error!("week={} stage={} failed: {}", week, stage.name(), e);
                return Err(e);
            }
            log::info!(
                "week={} stage={} completed in {:?}",
                week,
                stage.name(),
                stage_start.elapsed()
            );
        }

        log::info!(
            "week={} pipeline completed in {:?}, {} artifacts written",
            week,
            started.elapsed(),
            ctx.written().len()
        );
        Ok(RunArtifacts::new(week, ctx.written().to_vec()))
    }
}
