//! Per-type model dispatch.

use std::sync::Arc;

use uplift_model::{load_model, DemandModel};

use crate::artifacts::ArtifactKind;
use crate::error::PipelineResult;
use crate::storage::BlobStore;
use crate::types::PromoType;

/// Feature vector layout every model must declare, in order.
pub const FEATURE_COLUMNS: [&str; 6] = [
    "category_group",
    "analogs_group",
    "brand_group",
    "big_percentage",
    "big_demand",
    "demand_daily_before",
];

/// One pre-fitted model per promotion type.
#[derive(Clone)]
pub struct ModelRegistry {
    svp: Arc<dyn DemandModel>,
    aba: Arc<dyn DemandModel>,
}

impl ModelRegistry {
    /// Build a registry from already loaded models. Both must be
    /// structurally valid and declare [`FEATURE_COLUMNS`].
    pub fn new(svp: Arc<dyn DemandModel>, aba: Arc<dyn DemandModel>) -> PipelineResult<Self> {
        for model in [&svp, &aba] {
            model.validate()?;
            model.ensure_feature_order(&FEATURE_COLUMNS)?;
        }
        Ok(Self { svp, aba })
    }

    /// Load both model artifacts from storage.
    pub async fn load(store: &dyn BlobStore) -> PipelineResult<Self> {
        let svp = Self::load_one(store, PromoType::Svp).await?;
        let aba = Self::load_one(store, PromoType::Aba).await?;
        Self::new(svp, aba)
    }

    async fn load_one(store: &dyn BlobStore, promo_type: PromoType) -> PipelineResult<Arc<dyn DemandModel>> {
        let path = ArtifactKind::Model(promo_type).path();
        let bytes = store.get_blob(&path).await?;
        let model = load_model(&bytes)?;
        log::info!("promo_type={} loaded {} from {}", promo_type.slug(), model.name(), path);
        Ok(model)
    }

    pub fn for_type(&self, promo_type: PromoType) -> &Arc<dyn DemandModel> {
        match promo_type {
            PromoType::Svp => &self.svp,
            PromoType::Aba => &self.aba,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use uplift_model::{LinearModel, Link, ModelError, Tree, TreeEnsemble};

    fn linear(intercept: f64, names: &[&str]) -> Arc<dyn DemandModel> {
        Arc::new(LinearModel {
            feature_names: names.iter().map(|s| s.to_string()).collect(),
            intercept,
            coefficients: vec![0.0; names.len()],
            link: Link::Identity,
        })
    }

    #[test]
    fn dispatches_by_type() {
        let registry =
            ModelRegistry::new(linear(1.0, &FEATURE_COLUMNS), linear(2.0, &FEATURE_COLUMNS)).unwrap();
        let row = [0.0; 6];
        assert_eq!(registry.for_type(PromoType::Svp).predict_one(&row).unwrap(), 1.0);
        assert_eq!(registry.for_type(PromoType::Aba).predict_one(&row).unwrap(), 2.0);
    }

    #[test]
    fn rejects_model_with_other_layout() {
        let mut swapped = FEATURE_COLUMNS;
        swapped.swap(0, 1);
        let err = ModelRegistry::new(linear(1.0, &FEATURE_COLUMNS), linear(1.0, &swapped))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Model(ModelError::FeatureOrder { .. })));
    }

    #[test]
    fn rejects_structurally_broken_model() {
        let hollow: Arc<dyn DemandModel> = Arc::new(TreeEnsemble {
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            base_score: 0.0,
            link: Link::Identity,
            trees: vec![Tree { nodes: vec![] }],
        });
        let err = ModelRegistry::new(hollow, linear(1.0, &FEATURE_COLUMNS))
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Model(ModelError::InvalidArtifact(_))));

        let short: Arc<dyn DemandModel> = Arc::new(LinearModel {
            feature_names: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            intercept: 0.0,
            coefficients: vec![1.0],
            link: Link::Identity,
        });
        let err = ModelRegistry::new(linear(1.0, &FEATURE_COLUMNS), short)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Model(ModelError::InvalidArtifact(_))));
    }
}
