//! Loaders for externally produced source sheets.
//!
//! Expected columns:
//!   raw upload:        item_id, item_name, promo_type, discount, start_date, end_date
//!   product hierarchy: item_id, product_long_desc, lvl3_category_name,
//!                      lvl4_subcategory_name, lvl5_subsubcategory_name
//!   PIM table:         id, shelflife, brand
//!   autoorders:        item_id, autoorder_total
//!   brand map:         brand, brand_group
//!   category map:      item_subcategorylvl5, category_group
//!
//! Extra columns are ignored. Item ids go through [`normalize_key`] so that
//! `1001` and `1001.0` join.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::error::{PipelineError, PipelineResult};
use crate::table::read_records;
use crate::util::normalize_key;

/// One row of the weekly promotion upload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPromoRow {
    #[serde(deserialize_with = "deserialize_key")]
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub item_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub promo_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub discount: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub start_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HierarchyRow {
    #[serde(deserialize_with = "deserialize_key")]
    pub item_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub product_long_desc: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub lvl3_category_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub lvl4_subcategory_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub lvl5_subsubcategory_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PimRow {
    #[serde(deserialize_with = "deserialize_key")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number")]
    pub shelflife: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct AutoorderRow {
    #[serde(deserialize_with = "deserialize_key")]
    item_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number")]
    autoorder_total: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct BrandGroupRow {
    #[serde(default, deserialize_with = "deserialize_text")]
    brand: Option<String>,
    #[serde(default, deserialize_with = "deserialize_group")]
    brand_group: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
struct CategoryGroupRow {
    #[serde(default, deserialize_with = "deserialize_text")]
    item_subcategorylvl5: Option<String>,
    #[serde(default, deserialize_with = "deserialize_group")]
    category_group: Option<u32>,
}

/// Load the weekly upload. Every row must carry an item id.
pub fn load_raw_upload(artifact: &str, bytes: &[u8]) -> PipelineResult<Vec<RawPromoRow>> {
    let rows: Vec<RawPromoRow> = read_records(artifact, bytes)?;
    if let Some(pos) = rows.iter().position(|r| r.item_id.is_none()) {
        return Err(PipelineError::data_shape(
            artifact,
            format!("line {}: blank item_id", pos + 2),
        ));
    }
    Ok(rows)
}

/// Index hierarchy rows by item id. The first row for an id wins.
pub fn load_hierarchy(artifact: &str, bytes: &[u8]) -> PipelineResult<HashMap<String, HierarchyRow>> {
    let rows: Vec<HierarchyRow> = read_records(artifact, bytes)?;
    Ok(index_first(rows, |r| r.item_id.clone()))
}

/// Index PIM rows by id. The first row for an id wins.
pub fn load_pim(artifact: &str, bytes: &[u8]) -> PipelineResult<HashMap<String, PimRow>> {
    let rows: Vec<PimRow> = read_records(artifact, bytes)?;
    Ok(index_first(rows, |r| r.id.clone()))
}

/// Weekly autoorder totals by item id. The first row for an id wins;
/// rows without a total are skipped.
pub fn load_autoorders(artifact: &str, bytes: &[u8]) -> PipelineResult<HashMap<String, f64>> {
    let rows: Vec<AutoorderRow> = read_records(artifact, bytes)?;
    let mut totals = HashMap::with_capacity(rows.len());
    for row in rows {
        if let (Some(id), Some(total)) = (row.item_id, row.autoorder_total) {
            totals.entry(id).or_insert(total);
        }
    }
    Ok(totals)
}

/// Brand → group map. Keys are lower-cased to match the lookup side.
pub fn load_brand_groups(artifact: &str, bytes: &[u8]) -> PipelineResult<HashMap<String, u32>> {
    let rows: Vec<BrandGroupRow> = read_records(artifact, bytes)?;
    Ok(rows
        .into_iter()
        .filter_map(|r| Some((r.brand?.to_lowercase(), r.brand_group?)))
        .collect())
}

/// Subcategory → group map.
pub fn load_category_groups(artifact: &str, bytes: &[u8]) -> PipelineResult<HashMap<String, u32>> {
    let rows: Vec<CategoryGroupRow> = read_records(artifact, bytes)?;
    Ok(rows
        .into_iter()
        .filter_map(|r| Some((r.item_subcategorylvl5?, r.category_group?)))
        .collect())
}

fn index_first<T, F>(rows: Vec<T>, key: F) -> HashMap<String, T>
where
    F: Fn(&T) -> Option<String>,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(k) = key(&row) {
            index.entry(k).or_insert(row);
        }
    }
    index
}

// ---------------------------------------------------------------------------
// Lenient cell deserializers
// ---------------------------------------------------------------------------

fn deserialize_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(normalize_key(&s))
}

fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Spreadsheet exports write these for an empty numeric cell.
const NULL_TOKENS: [&str; 6] = ["nan", "na", "n/a", "null", "none", "#n/a"];

/// Numbers may use a decimal comma and thousands spaces (`"1 250,5"`).
/// Null tokens and non-finite values read as missing.
fn parse_number(raw: &str) -> Option<Result<f64, String>> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() || NULL_TOKENS.iter().any(|t| cleaned.eq_ignore_ascii_case(t)) {
        return None;
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Ok(v)),
        Ok(_) => None,
        Err(_) => Some(Err(format!("expected a number, got '{}'", raw))),
    }
}

fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_number(&s)
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn deserialize_group<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = deserialize_number(deserializer)?;
    match value {
        None => Ok(None),
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(Some(v as u32)),
        Some(v) => Err(serde::de::Error::custom(format!(
            "expected a non-negative whole group id, got '{}'",
            v
        ))),
    }
}
