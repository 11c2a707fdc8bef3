//! Normalized sample table and column resolution
//!
//! Ingestion adapters (CSV, sensor exports) produce a [`SampleTable`]: ordered
//! column names plus rows of optional text cells. The windower only needs four
//! of those columns, found through [`ColumnIndex`] by case-insensitive name
//! with a list of known synonyms.

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Synonyms tried after the canonical `X` name
pub const X_SYNONYMS: &[&str] = &["x", "acc_x", "accelerometer_x", "accelerometer x"];
/// Synonyms tried after the canonical `Y` name
pub const Y_SYNONYMS: &[&str] = &["y", "acc_y", "accelerometer_y", "accelerometer y"];
/// Synonyms tried after the canonical `Z` name
pub const Z_SYNONYMS: &[&str] = &["z", "acc_z", "accelerometer_z", "accelerometer z"];
/// Synonyms tried after the configured time column name
pub const TIME_SYNONYMS: &[&str] = &["time", "timestamp", "datetime"];

/// Cell values treated as missing (compared case-insensitively)
const NULL_TOKENS: &[&str] = &["", "nan", "na", "n/a", "null", "none", "nat", "<na>"];

/// True when `cell` is empty or a missing-value token such as `NaN`
pub fn is_null_token(cell: &str) -> bool {
    let trimmed = cell.trim();
    NULL_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

/// Normalize a raw cell: trims whitespace, maps missing-value tokens to `None`
pub fn normalize_cell(cell: &str) -> Option<String> {
    if is_null_token(cell) {
        None
    } else {
        Some(cell.trim().to_string())
    }
}

/// One sensor reading
#[derive(Debug, Clone, PartialEq)]
pub struct RawSample {
    /// Timestamp in any parseable representation
    pub time: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RawSample {
    pub fn new(time: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            time: time.into(),
            x,
            y,
            z,
        }
    }
}

/// Rows of optional text cells under named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleTable {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
    /// Source row number of `rows[0]` (0-based data row, header excluded)
    first_row: usize,
}

impl SampleTable {
    /// Empty table with the given columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            first_row: 0,
        }
    }

    /// Number rows from `first_row` when reporting errors (chunked input)
    pub fn with_first_row(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    pub fn first_row(&self) -> usize {
        self.first_row
    }

    /// Table with `Time, X, Y, Z` columns built from typed samples
    pub fn from_samples(samples: &[RawSample]) -> Self {
        let mut table = Self::new(["Time", "X", "Y", "Z"]);
        table.rows = samples
            .iter()
            .map(|s| {
                vec![
                    Some(s.time.clone()),
                    Some(s.x.to_string()),
                    Some(s.y.to_string()),
                    Some(s.z.to_string()),
                ]
            })
            .collect();
        table
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, cells: Vec<Option<String>>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::shape(format!(
                "row {} has {} cells, table has {} columns",
                self.first_row + self.rows.len(),
                cells.len(),
                self.columns.len()
            )));
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Append a row of raw text cells, normalizing missing-value tokens
    pub fn push_text_row<I, S>(&mut self, cells: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|c| normalize_cell(c.as_ref()))
            .collect();
        self.push_row(cells)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Lookup index over this table's column names
    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.columns)
    }
}

/// Case-folded column name lookup, built once per call
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    by_lower: HashMap<String, usize>,
    columns: Vec<String>,
}

impl ColumnIndex {
    /// Index `columns`; when two names fold to the same key the first wins
    pub fn new(columns: &[String]) -> Self {
        let mut by_lower = HashMap::with_capacity(columns.len());
        for (idx, name) in columns.iter().enumerate() {
            by_lower.entry(name.trim().to_lowercase()).or_insert(idx);
        }
        Self {
            by_lower,
            columns: columns.to_vec(),
        }
    }

    /// Position of `name`, compared case-insensitively
    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_lower.get(&name.trim().to_lowercase()).copied()
    }

    /// Resolve `canonical`, falling back to `synonyms` in order
    pub fn resolve(&self, canonical: &str, synonyms: &[&str]) -> Result<usize> {
        std::iter::once(canonical)
            .chain(synonyms.iter().copied())
            .find_map(|name| self.find(name))
            .ok_or_else(|| Error::MissingColumn {
                requested: canonical.to_string(),
                available: self.columns.clone(),
            })
    }
}

/// Positions of the four columns the windower reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisColumns {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub time: usize,
}

impl AxisColumns {
    /// Resolve X/Y/Z and the time column (canonical name `time_column`)
    pub fn resolve(index: &ColumnIndex, time_column: &str) -> Result<Self> {
        Ok(Self {
            x: index.resolve("X", X_SYNONYMS)?,
            y: index.resolve("Y", Y_SYNONYMS)?,
            z: index.resolve("Z", Z_SYNONYMS)?,
            time: index.resolve(time_column, TIME_SYNONYMS)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_null_tokens() {
        for token in ["", "  ", "NaN", "nan", "NA", "null", "None", "N/A"] {
            assert!(is_null_token(token), "{token:?} should be null");
        }
        for value in ["0", "0.0", "-1.5", "abc", "2024-01-01"] {
            assert!(!is_null_token(value), "{value:?} should not be null");
        }
    }

    #[test]
    fn test_normalize_cell_trims() {
        assert_eq!(normalize_cell(" 1.25 "), Some("1.25".to_string()));
        assert_eq!(normalize_cell("nan"), None);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let index = ColumnIndex::new(&names(&["time", "x", "Y", "z"]));
        assert_eq!(index.resolve("X", X_SYNONYMS).unwrap(), 1);
        assert_eq!(index.resolve("Y", Y_SYNONYMS).unwrap(), 2);
        assert_eq!(index.resolve("Time", TIME_SYNONYMS).unwrap(), 0);
    }

    #[test]
    fn test_canonical_name_wins_over_synonym() {
        let index = ColumnIndex::new(&names(&["acc_x", "X"]));
        assert_eq!(index.resolve("X", X_SYNONYMS).unwrap(), 1);
    }

    #[test]
    fn test_synonym_order_is_respected() {
        let index = ColumnIndex::new(&names(&["datetime", "timestamp"]));
        assert_eq!(index.resolve("Time", TIME_SYNONYMS).unwrap(), 1);
    }

    #[test]
    fn test_synonym_tables_resolve_identically() {
        let plain = ColumnIndex::new(&names(&["X", "Y", "Z", "Time"]));
        let synonyms = ColumnIndex::new(&names(&["acc_x", "acc_y", "acc_z", "timestamp"]));

        assert_eq!(
            AxisColumns::resolve(&plain, "Time").unwrap(),
            AxisColumns::resolve(&synonyms, "Time").unwrap()
        );
    }

    #[test]
    fn test_missing_column_lists_available() {
        let index = ColumnIndex::new(&names(&["Time", "X", "Y"]));
        let err = AxisColumns::resolve(&index, "Time").unwrap_err();

        match err {
            Error::MissingColumn {
                requested,
                available,
            } => {
                assert_eq!(requested, "Z");
                assert_eq!(available, names(&["Time", "X", "Y"]));
            }
            other => panic!("expected MissingColumn, got {other:?}"),
        }
    }

    #[test]
    fn test_custom_time_column_is_canonical() {
        let index = ColumnIndex::new(&names(&["recorded_at", "X", "Y", "Z"]));
        let cols = AxisColumns::resolve(&index, "recorded_at").unwrap();
        assert_eq!(cols.time, 0);
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = SampleTable::new(["Time", "X"]);
        assert!(table.push_text_row(["t0", "1"]).is_ok());
        assert!(matches!(
            table.push_text_row(["t1"]),
            Err(Error::Shape(_))
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_from_samples_layout() {
        let table = SampleTable::from_samples(&[RawSample::new("t0", 1.0, -2.5, 0.25)]);
        assert_eq!(table.columns(), &names(&["Time", "X", "Y", "Z"])[..]);
        assert_eq!(
            table.rows()[0],
            vec![
                Some("t0".to_string()),
                Some("1".to_string()),
                Some("-2.5".to_string()),
                Some("0.25".to_string())
            ]
        );
    }
}
