use async_trait::async_trait;
use std::collections::HashMap;

use crate::artifacts::ArtifactKind;
use crate::error::{PipelineError, PipelineResult};
use crate::promo_loader::{load_autoorders, load_brand_groups, load_category_groups};
use crate::records::{FeatureRow, PreparedRow};
use crate::rules::{
    analogs_group, demand_baseline, shelf_life_group, FILL_DISCOUNT, FILL_GROUP, FILL_SHELF_LIFE,
};
use crate::stage::{write_rows, RunContext, Stage, StageKind};
use crate::storage::BlobStore;
use crate::table::read_records;
use crate::types::{PromoType, WeekTag};
use crate::util::normalize_key;

/// Read-only lookups shared by both promotion types for one week.
#[derive(Debug, Default, Clone)]
pub struct FeatureInputs {
    /// Lower-cased brand → brand group.
    pub brand_groups: HashMap<String, u32>,
    /// Level-5 subcategory → category group.
    pub category_groups: HashMap<String, u32>,
    /// Autoorder totals for week-1, by item id.
    pub autoorders_before: HashMap<String, f64>,
    /// Autoorder totals for week-2, by item id.
    pub autoorders_before_before: HashMap<String, f64>,
}

impl FeatureInputs {
    /// Load both lookup tables and the two prior weeks of autoorders.
    pub async fn load(store: &dyn BlobStore, week: WeekTag) -> PipelineResult<Self> {
        async fn fetch(store: &dyn BlobStore, kind: ArtifactKind) -> PipelineResult<(String, Vec<u8>)> {
            let path = kind.path();
            let bytes = store.get_blob(&path).await?;
            Ok((path, bytes))
        }

        let (before_week, before_before_week) = (week.previous(1)?, week.previous(2)?);
        let (brands, categories, before, before_before) = tokio::try_join!(
            fetch(store, ArtifactKind::BrandGroups),
            fetch(store, ArtifactKind::CategoryGroups),
            fetch(store, ArtifactKind::Autoorders(before_week)),
            fetch(store, ArtifactKind::Autoorders(before_before_week)),
        )?;

        Ok(Self {
            brand_groups: load_brand_groups(&brands.0, &brands.1)?,
            category_groups: load_category_groups(&categories.0, &categories.1)?,
            autoorders_before: load_autoorders(&before.0, &before.1)?,
            autoorders_before_before: load_autoorders(&before_before.0, &before_before.1)?,
        })
    }
}

/// Turn prepared rows into model-ready feature rows.
///
/// Buckets are computed before defaults are filled, so a missing
/// shelf-life is bucketed as unknown and then stored as 1 day.
pub fn build_features(
    artifact: &str,
    rows: Vec<PreparedRow>,
    inputs: &FeatureInputs,
) -> PipelineResult<Vec<FeatureRow>> {
    rows.into_iter()
        .enumerate()
        .map(|(i, row)| -> PipelineResult<FeatureRow> {
            let shelflife_group = shelf_life_group(row.shelflife).ok_or_else(|| {
                PipelineError::data_shape(
                    artifact,
                    format!("line {}: invalid shelflife {:?}", i + 2, row.shelflife),
                )
            })?;
            let brand_group = row
                .brand
                .as_deref()
                .and_then(|b| inputs.brand_groups.get(&b.to_lowercase()))
                .copied();
            let category_group = row
                .item_subcategorylvl5
                .as_deref()
                .and_then(|c| inputs.category_groups.get(c))
                .copied();

            let key = row.id.as_deref().and_then(normalize_key);
            let total = |history: &HashMap<String, f64>| key.as_ref().and_then(|k| history.get(k)).copied();
            let baseline = demand_baseline(
                total(&inputs.autoorders_before),
                total(&inputs.autoorders_before_before),
            );

            Ok(FeatureRow {
                shelflife: row.shelflife.unwrap_or(FILL_SHELF_LIFE),
                discount_percentage: row.discount_percentage.unwrap_or(FILL_DISCOUNT),
                brand_group: brand_group.unwrap_or(FILL_GROUP),
                category_group: category_group.unwrap_or(FILL_GROUP),
                shelflife_group,
                analogs_group: analogs_group(row.analogs_count),
                demand_daily_before: baseline.daily_before,
                demand_daily_before_before: baseline.daily_before_before,
                uplift_before: baseline.uplift_before,
                id: row.id,
                item_name: row.item_name,
                item_subcategorylvl5: row.item_subcategorylvl5,
                brand: row.brand,
                analogs_count: row.analogs_count,
            })
        })
        .collect()
}

async fn build_for_type(
    store: &dyn BlobStore,
    week: WeekTag,
    promo_type: PromoType,
    inputs: &FeatureInputs,
) -> PipelineResult<String> {
    let source = ArtifactKind::Prepared(promo_type, week).path();
    let prepared: Vec<PreparedRow> = read_records(&source, &store.get_blob(&source).await?)?;
    let features = build_features(&source, prepared, inputs)?;
    let missing_demand = features.iter().filter(|f| f.demand_daily_before.is_none()).count();
    if missing_demand > 0 {
        log::warn!(
            "week={} promo_type={} {} of {} rows have no demand history",
            week,
            promo_type.slug(),
            missing_demand,
            features.len()
        );
    }
    let path = write_rows(store, ArtifactKind::Features(promo_type, week), &features).await?;
    log::info!(
        "week={} promo_type={} built {} feature rows -> {}",
        week,
        promo_type.slug(),
        features.len(),
        path
    );
    Ok(path)
}

/// Builds the feature tables for both promotion types.
///
/// Lookups and autoorder history are loaded once; the two types are then
/// processed concurrently.
pub struct FeatureBuilder;

#[async_trait]
impl Stage for FeatureBuilder {
    fn kind(&self) -> StageKind {
        StageKind::Preprocess
    }

    async fn run(&self, ctx: &mut RunContext) -> PipelineResult<()> {
        let week = ctx.week;
        let store = ctx.store().clone();
        let inputs = FeatureInputs::load(store.as_ref(), week).await?;
        log::debug!(
            "week={} loaded {} brand groups, {} category groups, {}/{} autoorder items",
            week,
            inputs.brand_groups.len(),
            inputs.category_groups.len(),
            inputs.autoorders_before.len(),
            inputs.autoorders_before_before.len()
        );

        let (svp, aba) = tokio::try_join!(
            build_for_type(store.as_ref(), week, PromoType::Svp, &inputs),
            build_for_type(store.as_ref(), week, PromoType::Aba, &inputs),
        )?;
        ctx.record_write(svp);
        ctx.record_write(aba);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(id: &str, shelflife: Option<f64>, analogs: Option<u32>) -> PreparedRow {
        PreparedRow {
            id: Some(id.to_string()),
            item_name: Some("Milk 1L".into()),
            item_subcategorylvl5: Some("Milk UHT".into()),
            shelflife,
            discount_percentage: None,
            brand: Some("FARM".into()),
            analogs_count: analogs,
        }
    }

    fn inputs() -> FeatureInputs {
        FeatureInputs {
            brand_groups: HashMap::from([("farm".to_string(), 4)]),
            category_groups: HashMap::from([("Milk UHT".to_string(), 7)]),
            autoorders_before: HashMap::from([("1".to_string(), 700.0), ("2".to_string(), 70.0)]),
            autoorders_before_before: HashMap::from([
                ("1".to_string(), 350.0),
                ("2".to_string(), 70.0),
            ]),
        }
    }

    #[test]
    fn groups_buckets_and_fills() {
        let rows = build_features("t", vec![prepared("2", Some(30.0), Some(5))], &inputs()).unwrap();
        let f = &rows[0];
        assert_eq!(f.brand_group, 4);
        assert_eq!(f.category_group, 7);
        assert_eq!(f.shelflife_group, 2);
        assert_eq!(f.analogs_group, 2);
        assert_eq!(f.discount_percentage, 0.20);
        assert_eq!(f.demand_daily_before, Some(10.0));
        assert_eq!(f.uplift_before, Some(1.0));
    }

    #[test]
    fn spiked_week_falls_back_to_the_week_before() {
        let rows = build_features("t", vec![prepared("1.0", Some(0.0), Some(1))], &inputs()).unwrap();
        let f = &rows[0];
        assert_eq!(f.uplift_before, Some(2.0));
        assert_eq!(f.demand_daily_before, Some(50.0));
        assert_eq!(f.demand_daily_before_before, Some(50.0));
    }

    #[test]
    fn unknown_item_gets_defaults_without_demand() {
        let mut row = prepared("999", None, Some(0));
        row.brand = None;
        row.item_subcategorylvl5 = None;
        let rows = build_features("t", vec![row], &inputs()).unwrap();
        let f = &rows[0];
        assert_eq!((f.brand_group, f.category_group), (1, 1));
        assert_eq!(f.shelflife_group, 1);
        assert_eq!(f.shelflife, 1.0);
        assert_eq!(f.analogs_group, 3);
        assert_eq!(f.demand_daily_before, None);
        assert_eq!(f.uplift_before, None);
    }

    #[test]
    fn negative_shelflife_is_rejected() {
        let err = build_features("t", vec![prepared("1", Some(-3.0), None)], &inputs()).unwrap_err();
        assert!(matches!(err, PipelineError::DataShape { .. }));
    }
}
