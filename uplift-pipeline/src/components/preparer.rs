use async_trait::async_trait;

use crate::artifacts::ArtifactKind;
use crate::error::PipelineResult;
use crate::records::PreparedRow;
use crate::rules::{count_analogs, parse_date, PromoSpan};
use crate::stage::{RunContext, Stage, StageKind};
use crate::table::{Columns, Table};
use crate::types::{PromoTag, PromoType, WeekTag};

/// Add an `analogs_count` column to the cumulative table.
///
/// A row's analogs are the rows in the same level-5 subcategory whose date
/// range overlaps its own; unparseable dates never overlap.
pub fn annotate_analogs(table: &mut Table, include_self: bool) -> PipelineResult<()> {
    let artifact = ArtifactKind::FullPromoInfo.path();
    let group_col = table.require_column(&artifact, "item_subcategorylvl5")?;
    let start_col = table.require_column(&artifact, "start_date")?;
    let end_col = table.require_column(&artifact, "end_date")?;

    let spans: Vec<PromoSpan<'_>> = (0..table.len())
        .map(|i| PromoSpan {
            subcategory: table.cell(i, group_col),
            start: table.cell(i, start_col).and_then(parse_date),
            end: table.cell(i, end_col).and_then(parse_date),
        })
        .collect();
    let counts: Vec<String> = count_analogs(&spans, include_self)
        .into_iter()
        .map(|c| c.to_string())
        .collect();

    table.set_column(&artifact, "analogs_count", counts)
}

/// Extract the rows of one `(type, week)` tag, restricted to the prepared
/// columns.
pub fn extract(table: &Table, tag: PromoTag) -> PipelineResult<Table> {
    let artifact = ArtifactKind::FullPromoInfo.path();
    let name_col = table.require_column(&artifact, "promo_name")?;
    table.project(&artifact, PreparedRow::COLUMNS, |row| tag.matches(&row[name_col]))
}

/// Counts analogs across the whole cumulative table and writes one
/// extract per promotion type for the current week.
pub struct Preparer {
    include_self: bool,
}

impl Preparer {
    pub fn new(include_self: bool) -> Self {
        Self { include_self }
    }
}

impl Default for Preparer {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Stage for Preparer {
    fn kind(&self) -> StageKind {
        StageKind::Prepare
    }

    async fn run(&self, ctx: &mut RunContext) -> PipelineResult<()> {
        let week: WeekTag = ctx.week;
        let mut table = ctx.read_table(ArtifactKind::FullPromoInfo).await?;
        annotate_analogs(&mut table, self.include_self)?;

        for promo_type in PromoType::ALL {
            let prepared = extract(&table, PromoTag::new(promo_type, week))?;
            let kind = ArtifactKind::Prepared(promo_type, week);
            let bytes = prepared.to_csv(&kind.path())?;
            ctx.write(kind, bytes).await?;
            log::info!(
                "week={} promo_type={} prepared {} rows -> {}",
                week,
                promo_type.slug(),
                prepared.len(),
                kind
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    fn cumulative() -> Table {
        let mut t = Table::new(
            [
                "item_id",
                "promo_name",
                "start_date",
                "end_date",
                "item_subcategorylvl5",
                "id",
                "item_name",
                "shelflife",
                "discount_percentage",
                "brand",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        let rows = [
            ("1", "СВП 37 (a-b)", "2024-09-01", "2024-09-10", "milk"),
            ("2", "АБА 37 (a-b)", "2024-09-05", "2024-09-15", "milk"),
            ("3", "СВП 36 (a-b)", "2024-09-20", "2024-09-30", "milk"),
            ("4", "СВП 37 (a-b)", "not a date", "2024-09-30", "milk"),
            ("5", "СВП 3 (a-b)", "2024-09-01", "2024-09-10", ""),
        ];
        for (id, name, start, end, group) in rows {
            t.push_record(&[
                ("item_id", id.into()),
                ("id", id.into()),
                ("promo_name", name.into()),
                ("start_date", start.into()),
                ("end_date", end.into()),
                ("item_subcategorylvl5", group.into()),
                ("shelflife", "0".into()),
                ("discount_percentage", "0.2".into()),
            ]);
        }
        t
    }

    fn analogs(t: &Table) -> Vec<String> {
        let col = t.column_index("analogs_count").unwrap();
        t.rows().map(|r| r[col].clone()).collect()
    }

    #[test]
    fn overlapping_rows_count_each_other() {
        let mut t = cumulative();
        annotate_analogs(&mut t, true).unwrap();
        assert_eq!(analogs(&t), vec!["2", "2", "1", "0", "0"]);

        let mut t = cumulative();
        annotate_analogs(&mut t, false).unwrap();
        assert_eq!(analogs(&t), vec!["1", "1", "0", "0", "0"]);
    }

    #[test]
    fn extract_keeps_only_tagged_rows_and_prepared_columns() {
        let mut t = cumulative();
        annotate_analogs(&mut t, true).unwrap();
        let week = WeekTag::new(37).unwrap();

        let svp = extract(&t, PromoTag::new(PromoType::Svp, week)).unwrap();
        assert_eq!(svp.columns(), PreparedRow::COLUMNS);
        let ids: Vec<&str> = svp.rows().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["1", "4"]);

        let aba = extract(&t, PromoTag::new(PromoType::Aba, week)).unwrap();
        assert_eq!(aba.len(), 1);
    }

    #[test]
    fn missing_subcategory_column_is_a_shape_error() {
        let mut t = Table::new(vec!["promo_name".into(), "start_date".into(), "end_date".into()]);
        assert!(matches!(
            annotate_analogs(&mut t, true),
            Err(PipelineError::DataShape { .. })
        ));
    }
}
