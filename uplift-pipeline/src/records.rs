//! Typed rows of the pipeline's own intermediate artifacts.
//!
//! Field order is the column order on disk; each `COLUMNS` list must match
//! the struct it belongs to.

use serde::{Deserialize, Serialize};

use crate::table::Columns;

/// Per-type extract handed from the preparer to the feature builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreparedRow {
    pub id: Option<String>,
    pub item_name: Option<String>,
    pub item_subcategorylvl5: Option<String>,
    pub shelflife: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub brand: Option<String>,
    pub analogs_count: Option<u32>,
}

impl Columns for PreparedRow {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "item_name",
        "item_subcategorylvl5",
        "shelflife",
        "discount_percentage",
        "brand",
        "analogs_count",
    ];
}

/// Model-ready row written by the feature builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub id: Option<String>,
    pub item_name: Option<String>,
    pub item_subcategorylvl5: Option<String>,
    pub shelflife: f64,
    pub discount_percentage: f64,
    pub brand: Option<String>,
    pub analogs_count: Option<u32>,
    pub brand_group: u32,
    pub category_group: u32,
    pub shelflife_group: u8,
    pub analogs_group: u8,
    pub demand_daily_before: Option<f64>,
    pub demand_daily_before_before: Option<f64>,
    pub uplift_before: Option<f64>,
}

impl Columns for FeatureRow {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "item_name",
        "item_subcategorylvl5",
        "shelflife",
        "discount_percentage",
        "brand",
        "analogs_count",
        "brand_group",
        "category_group",
        "shelflife_group",
        "analogs_group",
        "demand_daily_before",
        "demand_daily_before_before",
        "uplift_before",
    ];
}

/// Final prediction row: the feature row plus indicators and model output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    pub id: Option<String>,
    pub item_name: Option<String>,
    pub item_subcategorylvl5: Option<String>,
    pub shelflife: f64,
    pub discount_percentage: f64,
    pub brand: Option<String>,
    pub analogs_count: Option<u32>,
    pub brand_group: u32,
    pub category_group: u32,
    pub shelflife_group: u8,
    pub analogs_group: u8,
    pub demand_daily_before: Option<f64>,
    pub demand_daily_before_before: Option<f64>,
    pub uplift_before: Option<f64>,
    pub big_demand: u8,
    pub big_percentage: u8,
    pub demand_daily_during: f64,
    pub uplift: f64,
}

impl Columns for PredictionRow {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "item_name",
        "item_subcategorylvl5",
        "shelflife",
        "discount_percentage",
        "brand",
        "analogs_count",
        "brand_group",
        "category_group",
        "shelflife_group",
        "analogs_group",
        "demand_daily_before",
        "demand_daily_before_before",
        "uplift_before",
        "big_demand",
        "big_percentage",
        "demand_daily_during",
        "uplift",
    ];
}

impl PredictionRow {
    pub fn from_features(
        f: FeatureRow,
        big_demand: u8,
        big_percentage: u8,
        demand_daily_during: f64,
        uplift: f64,
    ) -> Self {
        Self {
            id: f.id,
            item_name: f.item_name,
            item_subcategorylvl5: f.item_subcategorylvl5,
            shelflife: f.shelflife,
            discount_percentage: f.discount_percentage,
            brand: f.brand,
            analogs_count: f.analogs_count,
            brand_group: f.brand_group,
            category_group: f.category_group,
            shelflife_group: f.shelflife_group,
            analogs_group: f.analogs_group,
            demand_daily_before: f.demand_daily_before,
            demand_daily_before_before: f.demand_daily_before_before,
            uplift_before: f.uplift_before,
            big_demand,
            big_percentage,
            demand_daily_during,
            uplift,
        }
    }
}
