use async_trait::async_trait;
use std::sync::Arc;

use uplift_model::DemandModel;

use crate::artifacts::ArtifactKind;
use crate::bundle;
use crate::error::PipelineResult;
use crate::models::ModelRegistry;
use crate::records::{FeatureRow, PredictionRow};
use crate::rules::{big_demand, big_percentage, uplift};
use crate::stage::{write_blob, RunContext, Stage, StageKind};
use crate::storage::BlobStore;
use crate::table::{read_records, write_records};
use crate::types::{PromoType, WeekTag};

/// Model input for one feature row, in `FEATURE_COLUMNS` order. Missing
/// demand is passed as NaN.
pub fn feature_vector(row: &FeatureRow, big_demand: u8, big_percentage: u8) -> Vec<f64> {
    vec![
        f64::from(row.category_group),
        f64::from(row.analogs_group),
        f64::from(row.brand_group),
        f64::from(big_percentage),
        f64::from(big_demand),
        row.demand_daily_before.unwrap_or(f64::NAN),
    ]
}

/// Score feature rows with `model` and derive the uplift ratio.
pub fn predict_rows(rows: Vec<FeatureRow>, model: &dyn DemandModel) -> PipelineResult<Vec<PredictionRow>> {
    let flags: Vec<(u8, u8)> = rows
        .iter()
        .map(|r| (big_demand(r.demand_daily_before), big_percentage(r.discount_percentage)))
        .collect();
    let inputs: Vec<Vec<f64>> = rows
        .iter()
        .zip(&flags)
        .map(|(r, &(demand, percentage))| feature_vector(r, demand, percentage))
        .collect();
    let predicted = model.predict(&inputs)?;

    Ok(rows
        .into_iter()
        .zip(flags)
        .zip(predicted)
        .map(|((row, (demand, percentage)), during)| {
            let ratio = uplift(during, row.demand_daily_before);
            PredictionRow::from_features(row, demand, percentage, during, ratio)
        })
        .collect())
}

async fn predict_for_type(
    store: &dyn BlobStore,
    week: WeekTag,
    promo_type: PromoType,
    model: &Arc<dyn DemandModel>,
) -> PipelineResult<(String, Vec<u8>)> {
    let source = ArtifactKind::Features(promo_type, week).path();
    let features: Vec<FeatureRow> = read_records(&source, &store.get_blob(&source).await?)?;
    let predictions = predict_rows(features, model.as_ref())?;

    let path = ArtifactKind::Predictions(promo_type, week).path();
    let bytes = write_records(&path, &predictions)?;
    write_blob(store, &path, bytes.clone()).await?;

    let undefined = predictions.iter().filter(|p| !p.uplift.is_finite()).count();
    log::info!(
        "week={} promo_type={} model={} predicted {} rows ({} without a finite uplift) -> {}",
        week,
        promo_type.slug(),
        model.name(),
        predictions.len(),
        undefined,
        path
    );
    Ok((path, bytes))
}

/// Scores both feature tables with their type's model, persists one
/// prediction sheet per type and packs both into the week's bundle.
pub struct Predictor {
    models: Option<ModelRegistry>,
}

impl Predictor {
    /// Load models from the run's store when the stage runs.
    pub fn from_store() -> Self {
        Self { models: None }
    }

    pub fn with_models(models: ModelRegistry) -> Self {
        Self { models: Some(models) }
    }
}

impl Default for Predictor {
    fn default() -> Self {
        Self::from_store()
    }
}

#[async_trait]
impl Stage for Predictor {
    fn kind(&self) -> StageKind {
        StageKind::Predict
    }

    async fn run(&self, ctx: &mut RunContext) -> PipelineResult<()> {
        let week = ctx.week;
        let store = ctx.store().clone();
        let models = match &self.models {
            Some(models) => models.clone(),
            None => ModelRegistry::load(store.as_ref()).await?,
        };

        let ((svp_path, svp_bytes), (aba_path, aba_bytes)) = tokio::try_join!(
            predict_for_type(store.as_ref(), week, PromoType::Svp, models.for_type(PromoType::Svp)),
            predict_for_type(store.as_ref(), week, PromoType::Aba, models.for_type(PromoType::Aba)),
        )?;
        ctx.record_write(svp_path);
        ctx.record_write(aba_path);

        let archive = bundle::pack(&[
            (ArtifactKind::bundle_entry(PromoType::Svp, week), svp_bytes),
            (ArtifactKind::bundle_entry(PromoType::Aba, week), aba_bytes),
        ])?;
        let path = ctx.write(ArtifactKind::Bundle(week), archive).await?;
        log::info!("week={} bundled predictions -> {}", week, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_model::{LinearModel, Link};

    use crate::models::FEATURE_COLUMNS;

    fn feature(demand: Option<f64>, discount: f64) -> FeatureRow {
        FeatureRow {
            id: Some("1".into()),
            item_name: None,
            item_subcategorylvl5: None,
            shelflife: 1.0,
            discount_percentage: discount,
            brand: None,
            analogs_count: Some(0),
            brand_group: 1,
            category_group: 2,
            shelflife_group: 1,
            analogs_group: 3,
            demand_daily_before: demand,
            demand_daily_before_before: demand,
            uplift_before: demand.map(|_| 1.0),
        }
    }

    /// Predicts `demand_daily_before * 1.5 + 10 * big_percentage`.
    fn model() -> LinearModel {
        LinearModel {
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            intercept: 0.0,
            coefficients: vec![0.0, 0.0, 0.0, 10.0, 0.0, 1.5],
            link: Link::Identity,
        }
    }

    #[test]
    fn vector_follows_feature_layout() {
        let v = feature_vector(&feature(Some(60.0), 0.2), 1, 0);
        assert_eq!(v, vec![2.0, 3.0, 1.0, 0.0, 1.0, 60.0]);
        assert!(feature_vector(&feature(None, 0.2), 0, 0)[5].is_nan());
    }

    #[test]
    fn indicators_and_uplift() {
        let rows = vec![feature(Some(60.0), 0.35), feature(Some(20.0), 0.2)];
        let out = predict_rows(rows, &model()).unwrap();

        assert_eq!((out[0].big_demand, out[0].big_percentage), (1, 1));
        assert_eq!(out[0].demand_daily_during, 100.0);
        assert_eq!((out[1].big_demand, out[1].big_percentage), (0, 0));
        assert_eq!(out[1].demand_daily_during, 30.0);
        assert_eq!(out[1].uplift, 1.5);
    }

    #[test]
    fn uplift_is_undefined_without_baseline() {
        let out = predict_rows(vec![feature(None, 0.2), feature(Some(0.0), 0.2)], &model()).unwrap();
        assert!(out[0].uplift.is_nan());
        assert!(!out[1].uplift.is_finite());
    }
}
