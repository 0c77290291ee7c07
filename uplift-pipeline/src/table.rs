//! Flat tabular artifacts.
//!
//! Every artifact is a single sheet: first row headers, one record per row,
//! serialized as CSV. Two views are offered:
//!
//! - [`Table`], a dynamic column-addressed grid for tables whose column set
//!   is owned by someone else (the cumulative promotion table);
//! - [`read_records`] / [`write_records`], serde-typed rows for the
//!   pipeline's own intermediate artifacts.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PipelineError, PipelineResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

fn reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(strip_bom(bytes))
}

/// Column names of a typed record, in serialization order.
pub trait Columns {
    const COLUMNS: &'static [&'static str];
}

/// Deserialize every row of a CSV artifact into `T`.
pub fn read_records<T: DeserializeOwned>(artifact: &str, bytes: &[u8]) -> PipelineResult<Vec<T>> {
    let mut rdr = reader(bytes);
    let mut records = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let record: T = result.map_err(|e| {
            PipelineError::data_shape(artifact, format!("line {}: {}", line_num + 2, e))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Serialize typed rows to CSV. The header is always written, so an empty
/// extract still carries its column contract.
pub fn write_records<T: Serialize + Columns>(artifact: &str, records: &[T]) -> PipelineResult<Vec<u8>> {
    let shape = |e: csv::Error| PipelineError::data_shape(artifact, e.to_string());
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(T::COLUMNS).map_err(shape)?;
    for record in records {
        wtr.serialize(record).map_err(shape)?;
    }
    wtr.into_inner()
        .map_err(|e| PipelineError::data_shape(artifact, e.to_string()))
}

/// Dynamic table. Cells are kept as text; a blank cell is a null.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_csv(artifact: &str, bytes: &[u8]) -> PipelineResult<Self> {
        let shape = |e: csv::Error| PipelineError::data_shape(artifact, e.to_string());
        let mut rdr = reader(bytes);
        let columns: Vec<String> = rdr.headers().map_err(shape)?.iter().map(String::from).collect();
        let width = columns.len();
        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(shape)?;
            let mut row: Vec<String> = record.iter().take(width).map(String::from).collect();
            row.resize(width, String::new());
            rows.push(row);
        }
        Ok(Self { columns, rows })
    }

    pub fn to_csv(&self, artifact: &str) -> PipelineResult<Vec<u8>> {
        let shape = |e: csv::Error| PipelineError::data_shape(artifact, e.to_string());
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        wtr.write_record(&self.columns).map_err(shape)?;
        for row in &self.rows {
            wtr.write_record(row).map_err(shape)?;
        }
        wtr.into_inner()
            .map_err(|e| PipelineError::data_shape(artifact, e.to_string()))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[String]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, artifact: &str, name: &str) -> PipelineResult<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::data_shape(artifact, format!("missing column '{}'", name)))
    }

    /// Cell text, or `None` when blank.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Add a column, or overwrite it if it exists. `values` must have one
    /// entry per row.
    pub fn set_column(&mut self, artifact: &str, name: &str, values: Vec<String>) -> PipelineResult<()> {
        if values.len() != self.rows.len() {
            return Err(PipelineError::data_shape(
                artifact,
                format!(
                    "column '{}' has {} values for {} rows",
                    name,
                    values.len(),
                    self.rows.len()
                ),
            ));
        }
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
        Ok(())
    }

    /// Keep only rows for which `keep` returns true.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[String]) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Append a record given as `(column, value)` pairs, reindexed to this
    /// table's column order. Columns the record does not name are left
    /// blank; fields this table has no column for are dropped.
    pub fn push_record(&mut self, fields: &[(&str, String)]) {
        let row = self
            .columns
            .iter()
            .map(|col| {
                fields
                    .iter()
                    .find(|(name, _)| *name == col.as_str())
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            })
            .collect();
        self.rows.push(row);
    }

    /// New table with only `names`, in that order, and the rows `keep` accepts.
    pub fn project<F>(&self, artifact: &str, names: &[&str], mut keep: F) -> PipelineResult<Table>
    where
        F: FnMut(&[String]) -> bool,
    {
        let indices = names
            .iter()
            .map(|name| self.require_column(artifact, name))
            .collect::<PipelineResult<Vec<_>>>()?;
        let rows = self
            .rows
            .iter()
            .filter(|row| keep(row))
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: names.iter().map(|s| s.to_string()).collect(),
            rows,
        })
    }
}
