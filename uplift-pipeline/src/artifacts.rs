//! Catalogue of every blob the pipeline reads or writes.
//!
//! Paths are only ever built here, so a typo in a template is a compile-time
//! edit in one place rather than a silent miss at runtime.

use std::fmt;

use crate::types::{PromoType, WeekTag};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Weekly promotion sheet as uploaded.
    RawUpload(WeekTag),
    ProductHierarchy,
    PimTable,
    /// Cumulative promotion table.
    FullPromoInfo,
    /// Per-type extract written by the preparer.
    Prepared(PromoType, WeekTag),
    /// Weekly autoorder totals per item, shared by both promotion types.
    Autoorders(WeekTag),
    BrandGroups,
    CategoryGroups,
    /// Per-type feature table written by the feature builder.
    Features(PromoType, WeekTag),
    Predictions(PromoType, WeekTag),
    /// Zip archive with both prediction sheets.
    Bundle(WeekTag),
    Model(PromoType),
}

impl ArtifactKind {
    pub fn path(&self) -> String {
        match *self {
            ArtifactKind::RawUpload(week) => format!("source_files/pw_{}.csv", week),
            ArtifactKind::ProductHierarchy => "source_files/products_hierarchy.csv".into(),
            ArtifactKind::PimTable => "source_files/pim_table.csv".into(),
            ArtifactKind::FullPromoInfo => "source_files/full_promo_info.csv".into(),
            ArtifactKind::Prepared(t, week) => {
                format!("prepared_to_preprocess/{}{}_prep.csv", t.slug(), week)
            }
            ArtifactKind::Autoorders(week) => {
                format!("item_autoorders/svp{}_autoorder_period.csv", week)
            }
            ArtifactKind::BrandGroups => "feature_maps/brand_groups_map.csv".into(),
            ArtifactKind::CategoryGroups => "feature_maps/category_groups_map.csv".into(),
            ArtifactKind::Features(t, week) => {
                format!("data_for_predictions/{}{}.csv", t.slug(), week)
            }
            ArtifactKind::Predictions(t, week) => format!("predictions/{}{}.csv", t.slug(), week),
            ArtifactKind::Bundle(week) => format!("predictions/predictions_week_{}.zip", week),
            ArtifactKind::Model(PromoType::Svp) => "models/svp/svp_xgb_001.json".into(),
            ArtifactKind::Model(PromoType::Aba) => "models/aba/aba_lgb_003.json".into(),
        }
    }

    /// File name used for a prediction sheet inside the bundle.
    pub fn bundle_entry(promo_type: PromoType, week: WeekTag) -> String {
        format!("{}_{}.csv", promo_type.slug(), week)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_render_week_and_type() {
        let week: WeekTag = "37".parse().unwrap();
        assert_eq!(
            ArtifactKind::Prepared(PromoType::Aba, week).path(),
            "prepared_to_preprocess/aba37_prep.csv"
        );
        assert_eq!(
            ArtifactKind::Autoorders(week.previous(1).unwrap()).path(),
            "item_autoorders/svp36_autoorder_period.csv"
        );
        assert_eq!(
            ArtifactKind::Predictions(PromoType::Svp, week).path(),
            "predictions/svp37.csv"
        );
        assert_eq!(ArtifactKind::bundle_entry(PromoType::Svp, week), "svp_37.csv");
    }
}
