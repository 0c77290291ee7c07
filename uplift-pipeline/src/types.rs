use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

// ---------------------------------------------------------------------------
// Promotion type
// ---------------------------------------------------------------------------

/// The two promotion campaign kinds. Each has its own naming marker, its own
/// artifacts and its own demand model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PromoType {
    Svp,
    Aba,
}

impl PromoType {
    /// Both variants in processing order.
    pub const ALL: [PromoType; 2] = [PromoType::Svp, PromoType::Aba];

    /// Marker used in raw labels and derived promotion names.
    pub fn marker(self) -> &'static str {
        match self {
            PromoType::Svp => "СВП",
            PromoType::Aba => "АБА",
        }
    }

    /// Lower-case ASCII slug used in artifact paths.
    pub fn slug(self) -> &'static str {
        match self {
            PromoType::Svp => "svp",
            PromoType::Aba => "aba",
        }
    }

    /// Classify a raw promotion label. Anything not carrying the SVP marker
    /// (including a blank label) is ABA.
    pub fn classify_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if l.contains(PromoType::Svp.marker()) => PromoType::Svp,
            _ => PromoType::Aba,
        }
    }

    /// Derive the type from the first three characters of a promotion name.
    pub fn from_promo_name(name: &str) -> PipelineResult<Self> {
        let head: String = name.chars().take(3).collect();
        head.parse()
    }
}

impl FromStr for PromoType {
    type Err = PipelineError;

    /// Accepts the marker or the slug. Anything else is a dispatch error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        PromoType::ALL
            .into_iter()
            .find(|t| s == t.marker() || s.eq_ignore_ascii_case(t.slug()))
            .ok_or_else(|| PipelineError::UnknownPromoType(s.to_string()))
    }
}

impl fmt::Display for PromoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

// ---------------------------------------------------------------------------
// Week tag
// ---------------------------------------------------------------------------

/// Promotion week identifier, the partition key for every artifact of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WeekTag(u32);

impl WeekTag {
    pub fn new(week: u32) -> PipelineResult<Self> {
        if week == 0 {
            return Err(PipelineError::InvalidWeek(week.to_string()));
        }
        Ok(WeekTag(week))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    /// The week `offset` weeks earlier.
    pub fn previous(self, offset: u32) -> PipelineResult<Self> {
        match self.0.checked_sub(offset) {
            Some(week) if week > 0 => Ok(WeekTag(week)),
            _ => Err(PipelineError::InvalidWeek(format!(
                "{} has no week {} weeks earlier",
                self.0, offset
            ))),
        }
    }

    /// Extract the week from an upload name of the form `<prefix>_<week>.<ext>`.
    pub fn from_file_name(name: &str) -> PipelineResult<Self> {
        let stem = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let stem = stem.split('.').next().unwrap_or(stem);
        let week = stem.rsplit('_').next().unwrap_or(stem);
        week.parse()
    }
}

impl FromStr for WeekTag {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(PipelineError::InvalidWeek(s.to_string()));
        }
        let week = trimmed
            .parse::<u32>()
            .map_err(|_| PipelineError::InvalidWeek(s.to_string()))?;
        WeekTag::new(week)
    }
}

impl fmt::Display for WeekTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Promotion tag
// ---------------------------------------------------------------------------

/// `(type, week)` pair identifying one promotion set in the cumulative table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PromoTag {
    pub promo_type: PromoType,
    pub week: WeekTag,
}

impl PromoTag {
    pub fn new(promo_type: PromoType, week: WeekTag) -> Self {
        Self { promo_type, week }
    }

    /// Does a promotion name belong to this tag?
    ///
    /// The name must contain `<marker> <week>` with no digit directly after
    /// the week, so week 3 never claims the rows of week 37.
    pub fn matches(&self, promo_name: &str) -> bool {
        let needle = self.to_string();
        promo_name.match_indices(&needle).any(|(start, _)| {
            !promo_name[start + needle.len()..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
    }

    /// Derived promotion name: `<marker> <week> (<start>-<end>)`.
    pub fn promo_name(&self, start: &str, end: &str) -> String {
        format!("{} ({}-{})", self, start, end)
    }
}

impl fmt::Display for PromoTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.promo_type.marker(), self.week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week(n: u32) -> WeekTag {
        WeekTag::new(n).unwrap()
    }

    #[test]
    fn label_classification_defaults_to_aba() {
        assert_eq!(PromoType::classify_label(Some("Акция СВП осень")), PromoType::Svp);
        assert_eq!(PromoType::classify_label(Some("АБА")), PromoType::Aba);
        assert_eq!(PromoType::classify_label(Some("something else")), PromoType::Aba);
        assert_eq!(PromoType::classify_label(None), PromoType::Aba);
    }

    #[test]
    fn type_from_name_uses_first_three_chars() {
        let name = PromoTag::new(PromoType::Svp, week(37)).promo_name("2024-09-09", "2024-09-15");
        assert_eq!(name, "СВП 37 (2024-09-09-2024-09-15)");
        assert_eq!(PromoType::from_promo_name(&name).unwrap(), PromoType::Svp);
        assert!(matches!(
            PromoType::from_promo_name("XYZ 37"),
            Err(PipelineError::UnknownPromoType(_))
        ));
    }

    #[test]
    fn parse_accepts_marker_and_slug() {
        assert_eq!("АБА".parse::<PromoType>().unwrap(), PromoType::Aba);
        assert_eq!("SVP".parse::<PromoType>().unwrap(), PromoType::Svp);
        assert!("promo".parse::<PromoType>().is_err());
    }

    #[test]
    fn tag_match_respects_week_boundary() {
        let tag3 = PromoTag::new(PromoType::Svp, week(3));
        let tag37 = PromoTag::new(PromoType::Svp, week(37));
        let name = "СВП 37 (01.09.2024-07.09.2024)";
        assert!(tag37.matches(name));
        assert!(!tag3.matches(name));
        assert!(!PromoTag::new(PromoType::Aba, week(37)).matches(name));
        assert!(tag37.matches("СВП 37"));
    }

    #[test]
    fn week_parsing() {
        assert_eq!("37".parse::<WeekTag>().unwrap().number(), 37);
        assert_eq!(" 5 ".parse::<WeekTag>().unwrap().number(), 5);
        assert!("0".parse::<WeekTag>().is_err());
        assert!("-1".parse::<WeekTag>().is_err());
        assert!("3a".parse::<WeekTag>().is_err());
        assert!(week(2).previous(2).is_err());
        assert_eq!(week(37).previous(2).unwrap().number(), 35);
    }

    #[test]
    fn week_from_upload_name() {
        assert_eq!(WeekTag::from_file_name("pw_37.csv").unwrap().number(), 37);
        assert_eq!(WeekTag::from_file_name("uploads/promo_week_12.xlsx").unwrap().number(), 12);
        assert!(WeekTag::from_file_name("promo.csv").is_err());
    }
}
