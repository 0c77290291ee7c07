use async_trait::async_trait;
use std::collections::HashMap;

use crate::artifacts::ArtifactKind;
use crate::error::{PipelineError, PipelineResult};
use crate::promo_loader::{load_hierarchy, load_pim, load_raw_upload, HierarchyRow, PimRow, RawPromoRow};
use crate::rules::normalize_discount;
use crate::stage::{RunContext, Stage, StageKind};
use crate::table::Table;
use crate::types::{PromoTag, PromoType, WeekTag};

/// Column order of a freshly created cumulative table.
pub const CUMULATIVE_COLUMNS: [&str; 13] = [
    "item_id",
    "promo_type",
    "discount_percentage",
    "start_date",
    "end_date",
    "promo_name",
    "item_name",
    "item_category",
    "item_subcategory",
    "item_subcategorylvl5",
    "id",
    "shelflife",
    "brand",
];

/// A weekly upload row after naming, discount normalization and both joins.
#[derive(Clone, Debug, PartialEq)]
pub struct RegisteredPromo {
    pub item_id: String,
    pub promo_type: PromoType,
    pub discount_percentage: f64,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub promo_name: String,
    pub item_name: Option<String>,
    pub item_category: Option<String>,
    pub item_subcategory: Option<String>,
    pub item_subcategorylvl5: Option<String>,
    pub shelflife: f64,
    pub brand: Option<String>,
}

impl RegisteredPromo {
    /// Cells keyed by cumulative-table column name.
    fn fields(&self) -> Vec<(&'static str, String)> {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            ("item_id", self.item_id.clone()),
            ("promo_type", self.promo_type.marker().to_string()),
            ("discount_percentage", self.discount_percentage.to_string()),
            ("start_date", text(&self.start_date)),
            ("end_date", text(&self.end_date)),
            ("promo_name", self.promo_name.clone()),
            ("item_name", text(&self.item_name)),
            ("item_category", text(&self.item_category)),
            ("item_subcategory", text(&self.item_subcategory)),
            ("item_subcategorylvl5", text(&self.item_subcategorylvl5)),
            ("id", self.item_id.clone()),
            ("shelflife", self.shelflife.to_string()),
            ("brand", text(&self.brand)),
        ]
    }
}

/// Name, normalize and enrich the uploaded rows.
///
/// Every row is named after the first row's date range. Items missing from
/// the hierarchy keep null hierarchy fields; items missing from the PIM
/// table get shelf-life 0 and no brand.
pub fn register_rows(
    week: WeekTag,
    upload: Vec<RawPromoRow>,
    hierarchy: &HashMap<String, HierarchyRow>,
    pim: &HashMap<String, PimRow>,
) -> PipelineResult<Vec<RegisteredPromo>> {
    let (start, end) = match upload.first() {
        Some(first) => (
            first.start_date.clone().unwrap_or_default(),
            first.end_date.clone().unwrap_or_default(),
        ),
        None => return Ok(Vec::new()),
    };

    upload
        .into_iter()
        .map(|row| -> PipelineResult<RegisteredPromo> {
            let label_type = PromoType::classify_label(row.promo_type.as_deref());
            let promo_name = PromoTag::new(label_type, week).promo_name(&start, &end);
            let promo_type = PromoType::from_promo_name(&promo_name)?;
            let item_id = row.item_id.ok_or_else(|| {
                PipelineError::data_shape(ArtifactKind::RawUpload(week).path(), "blank item_id")
            })?;

            let h = hierarchy.get(&item_id);
            let p = pim.get(&item_id);

            Ok(RegisteredPromo {
                promo_type,
                discount_percentage: normalize_discount(row.discount),
                start_date: row.start_date,
                end_date: row.end_date,
                promo_name,
                item_name: h.and_then(|h| h.product_long_desc.clone()),
                item_category: h.and_then(|h| h.lvl3_category_name.clone()),
                item_subcategory: h.and_then(|h| h.lvl4_subcategory_name.clone()),
                item_subcategorylvl5: h.and_then(|h| h.lvl5_subsubcategory_name.clone()),
                shelflife: p.and_then(|p| p.shelflife).unwrap_or(0.0),
                brand: p.and_then(|p| p.brand.clone()),
                item_id,
            })
        })
        .collect()
}

/// Replace the `(type, week)` slice of the cumulative table with `rows`.
///
/// Types are processed in [`PromoType::ALL`] order. New rows are reindexed
/// to the table's existing columns; a table without a header gets the
/// canonical column order.
pub fn merge_into_cumulative(
    mut cumulative: Table,
    week: WeekTag,
    rows: &[RegisteredPromo],
) -> PipelineResult<Table> {
    let artifact = ArtifactKind::FullPromoInfo.path();
    if cumulative.columns().is_empty() {
        cumulative = Table::new(CUMULATIVE_COLUMNS.iter().map(|c| c.to_string()).collect());
    }
    let name_col = cumulative.require_column(&artifact, "promo_name")?;

    for promo_type in PromoType::ALL {
        let tag = PromoTag::new(promo_type, week);
        cumulative.retain_rows(|row| !tag.matches(&row[name_col]));
        for row in rows.iter().filter(|r| r.promo_type == promo_type) {
            cumulative.push_record(&row.fields());
        }
    }
    Ok(cumulative)
}

/// Registers the week's upload into the cumulative promotion table.
///
/// Reads the raw upload, the product hierarchy, the PIM table and the
/// cumulative table; any missing input aborts the stage.
pub struct Registrar;

#[async_trait]
impl Stage for Registrar {
    fn kind(&self) -> StageKind {
        StageKind::Register
    }

    async fn run(&self, ctx: &mut RunContext) -> PipelineResult<()> {
        let week = ctx.week;
        let raw_kind = ArtifactKind::RawUpload(week);
        let upload = load_raw_upload(&raw_kind.path(), &ctx.read(raw_kind).await?)?;
        if upload.is_empty() {
            return Err(PipelineError::data_shape(raw_kind.path(), "upload has no rows"));
        }

        let hierarchy = load_hierarchy(
            &ArtifactKind::ProductHierarchy.path(),
            &ctx.read(ArtifactKind::ProductHierarchy).await?,
        )?;
        let pim = load_pim(&ArtifactKind::PimTable.path(), &ctx.read(ArtifactKind::PimTable).await?)?;
        let cumulative = ctx.read_table(ArtifactKind::FullPromoInfo).await?;
        let before = cumulative.len();

        let rows = register_rows(week, upload, &hierarchy, &pim)?;
        let svp = rows.iter().filter(|r| r.promo_type == PromoType::Svp).count();
        let unmatched = rows.iter().filter(|r| !hierarchy.contains_key(&r.item_id)).count();
        if unmatched > 0 {
            log::warn!("week={} {} uploaded items not in product hierarchy", week, unmatched);
        }

        let merged = merge_into_cumulative(cumulative, week, &rows)?;
        log::info!(
            "week={} registered {} rows (svp={}, aba={}); cumulative table {} -> {} rows",
            week,
            rows.len(),
            svp,
            rows.len() - svp,
            before,
            merged.len()
        );

        let kind = ArtifactKind::FullPromoInfo;
        let bytes = merged.to_csv(&kind.path())?;
        ctx.write(kind, bytes).await?;
        Ok(())
    }
}
