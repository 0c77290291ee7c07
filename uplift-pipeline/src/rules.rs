//! Business rules shared by the pipeline stages.
//!
//! Everything here is a pure function of its inputs so the stages stay thin
//! and the thresholds can be tested in isolation.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;

use crate::util::round_to;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Raw discount assumed when the upload leaves it blank (raw sheets use a
/// negative sign for discounts).
pub const DEFAULT_RAW_DISCOUNT: f64 = -0.20;
/// Upper bound of the stored discount fraction.
pub const MAX_DISCOUNT: f64 = 0.35;
/// Shelf-life above this many days counts as long-life.
pub const LONG_SHELF_LIFE_DAYS: f64 = 90.0;
/// Shelf-life at or below this many days counts as short-life.
pub const SHORT_SHELF_LIFE_DAYS: f64 = 25.0;
/// Week-over-week demand ratio at which last week is treated as a spike.
pub const DEMAND_SPIKE_RATIO: f64 = 1.6;
pub const DAYS_PER_WEEK: f64 = 7.0;
/// Daily demand above which an item is a high-volume seller.
pub const BIG_DEMAND_THRESHOLD: f64 = 50.0;
/// Discount at or above which a promotion is a deep discount.
pub const BIG_DISCOUNT_THRESHOLD: f64 = 0.35;

/// Fill values for nulls left after bucketing.
pub const FILL_SHELF_LIFE: f64 = 1.0;
pub const FILL_GROUP: u32 = 1;
pub const FILL_DISCOUNT: f64 = 0.20;

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

/// Raw (negative) discount to stored positive fraction: default, negate,
/// round to 2 places, cap.
pub fn normalize_discount(raw: Option<f64>) -> f64 {
    round_to(-raw.unwrap_or(DEFAULT_RAW_DISCOUNT), 2).min(MAX_DISCOUNT)
}

/// Lenient date parsing. Anything unrecognized is `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y", "%Y/%m/%d"];
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d.%m.%Y %H:%M:%S"];

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

// ---------------------------------------------------------------------------
// Analogs
// ---------------------------------------------------------------------------

/// One promotion row reduced to what overlap counting needs.
#[derive(Clone, Copy, Debug)]
pub struct PromoSpan<'a> {
    pub subcategory: Option<&'a str>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// For each span, count spans in the same subcategory whose inclusive date
/// range overlaps it. Spans without a subcategory or with a missing date
/// count 0 and are never counted by others.
///
/// With `include_self` a span counts itself whenever its own range is
/// non-empty.
pub fn count_analogs(spans: &[PromoSpan<'_>], include_self: bool) -> Vec<u32> {
    let mut groups: HashMap<&str, Vec<(NaiveDate, NaiveDate)>> = HashMap::new();
    for span in spans {
        if let (Some(group), Some(start), Some(end)) = (span.subcategory, span.start, span.end) {
            groups.entry(group).or_default().push((start, end));
        }
    }

    spans
        .par_iter()
        .map(|span| {
            let (Some(group), Some(start), Some(end)) = (span.subcategory, span.start, span.end)
            else {
                return 0;
            };
            let members = groups.get(group).map(Vec::as_slice).unwrap_or_default();
            let overlapping = members
                .iter()
                .filter(|(other_start, other_end)| *other_start <= end && *other_end >= start)
                .count() as u32;
            if !include_self && start <= end {
                overlapping.saturating_sub(1)
            } else {
                overlapping
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Feature buckets
// ---------------------------------------------------------------------------

/// Shelf-life bucket: 1 = unknown (0 or missing) or long (>90 days),
/// 2 = (25, 90], 3 = (0, 25]. `None` for a negative or NaN value.
pub fn shelf_life_group(days: Option<f64>) -> Option<u8> {
    match days {
        None => Some(1),
        Some(d) if d == 0.0 || d > LONG_SHELF_LIFE_DAYS => Some(1),
        Some(d) if d > SHORT_SHELF_LIFE_DAYS => Some(2),
        Some(d) if d > 0.0 => Some(3),
        Some(_) => None,
    }
}

/// Analogs bucket: exactly 1 → 1, 2..=9 → 2, anything else → 3.
pub fn analogs_group(count: Option<u32>) -> u8 {
    match count {
        Some(1) => 1,
        Some(2..=9) => 2,
        _ => 3,
    }
}

// ---------------------------------------------------------------------------
// Demand baseline
// ---------------------------------------------------------------------------

/// Daily demand ahead of the promotion, derived from two weeks of history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DemandBaseline {
    /// Week-1 daily demand, replaced by week-2's when week-1 spiked.
    pub daily_before: Option<f64>,
    pub daily_before_before: Option<f64>,
    /// Unadjusted week-1 / week-2 ratio.
    pub uplift_before: Option<f64>,
}

/// Build the baseline from weekly autoorder totals for week-1 and week-2.
pub fn demand_baseline(total_before: Option<f64>, total_before_before: Option<f64>) -> DemandBaseline {
    let daily_before = total_before.map(|t| t / DAYS_PER_WEEK);
    let daily_before_before = total_before_before.map(|t| t / DAYS_PER_WEEK);
    let uplift_before = match (daily_before, daily_before_before) {
        (Some(b), Some(bb)) => Some(b / bb),
        _ => None,
    };
    let spiked = uplift_before.is_some_and(|u| u >= DEMAND_SPIKE_RATIO);
    DemandBaseline {
        daily_before: if spiked { daily_before_before } else { daily_before },
        daily_before_before,
        uplift_before,
    }
}

// ---------------------------------------------------------------------------
// Prediction
// ---------------------------------------------------------------------------

pub fn big_demand(daily_before: Option<f64>) -> u8 {
    u8::from(daily_before.is_some_and(|d| d > BIG_DEMAND_THRESHOLD))
}

pub fn big_percentage(discount: f64) -> u8 {
    u8::from(discount >= BIG_DISCOUNT_THRESHOLD)
}

/// Predicted over baseline daily demand. NaN when there is no baseline,
/// NaN or infinite when the baseline is zero.
pub fn uplift(demand_during: f64, daily_before: Option<f64>) -> f64 {
    daily_before.map_or(f64::NAN, |before| demand_during / before)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn every_valid_shelf_life_lands_in_a_bucket(days in 0u32..10_000) {
            let group = shelf_life_group(Some(days as f64));
            prop_assert!(matches!(group, Some(1..=3)));
        }

        #[test]
        fn stored_discount_never_exceeds_cap(raw in -5.0f64..0.0) {
            let d = normalize_discount(Some(raw));
            prop_assert!(d <= MAX_DISCOUNT);
            prop_assert!(d >= 0.0);
        }

        #[test]
        fn excluding_self_removes_exactly_one(starts in proptest::collection::vec(1u32..20, 1..12)) {
            let spans: Vec<PromoSpan<'_>> = starts
                .iter()
                .map(|&s| PromoSpan {
                    subcategory: Some("g"),
                    start: NaiveDate::from_ymd_opt(2024, 1, s),
                    end: NaiveDate::from_ymd_opt(2024, 1, s + 5),
                })
                .collect();
            let with_self = count_analogs(&spans, true);
            let without = count_analogs(&spans, false);
            for (a, b) in with_self.iter().zip(&without) {
                prop_assert_eq!(*a, b + 1);
            }
        }
    }
}
