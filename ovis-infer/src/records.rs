//! Flattened and labeled window records
//!
//! A [`FlattenedRow`] is the externally visible form of one window: the x, y
//! and z series plus the window's representative timestamp. Its tabular form
//! uses 1-indexed positional columns `x_1..x_W`, `y_1..y_W`, `z_1..z_W`
//! followed by `Time`.

use crate::error::{Error, Result};
use crate::table::ColumnIndex;

/// Column holding the window timestamp
pub const TIME_FIELD: &str = "Time";
/// Column holding the predicted label
pub const BEHAVIOUR_FIELD: &str = "behaviour";
/// Column holding the winning class probability
pub const CONFIDENCE_FIELD: &str = "confidence";

const AXIS_PREFIXES: [&str; 3] = ["x", "y", "z"];

/// One flattened window
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedRow {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    /// Timestamp of the last sample in the window, as it appeared in the input
    pub time: String,
    /// Entity id (e.g. sheep id) of the last sample, when tracked
    pub entity: Option<String>,
}

impl FlattenedRow {
    /// Series in x, y, z order
    pub fn axes(&self) -> [&[f64]; 3] {
        [self.x.as_slice(), self.y.as_slice(), self.z.as_slice()]
    }

    fn check_length(&self, window_length: usize, row: usize) -> Result<()> {
        for (prefix, series) in AXIS_PREFIXES.iter().zip(self.axes()) {
            if series.len() != window_length {
                return Err(Error::shape(format!(
                    "row {}: {} series has {} samples, expected {}",
                    row,
                    prefix,
                    series.len(),
                    window_length
                )));
            }
        }
        Ok(())
    }
}

/// Ordered flattened windows of one fixed length
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedTable {
    window_length: usize,
    entity_column: Option<String>,
    rows: Vec<FlattenedRow>,
}

impl FlattenedTable {
    pub fn new(window_length: usize) -> Self {
        Self {
            window_length,
            entity_column: None,
            rows: Vec::new(),
        }
    }

    /// Track an entity column; it is exported after `Time`
    pub fn with_entity_column(mut self, name: impl Into<String>) -> Self {
        self.entity_column = Some(name.into());
        self
    }

    /// Append a row, rejecting series of the wrong length
    pub fn push(&mut self, row: FlattenedRow) -> Result<()> {
        row.check_length(self.window_length, self.rows.len())?;
        self.rows.push(row);
        Ok(())
    }

    /// Append every row of `other`
    pub fn append(&mut self, other: FlattenedTable) -> Result<()> {
        if other.window_length != self.window_length {
            return Err(Error::shape(format!(
                "cannot append windows of length {} to a table of length {}",
                other.window_length, self.window_length
            )));
        }
        for row in other.rows {
            self.push(row)?;
        }
        Ok(())
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn entity_column(&self) -> Option<&str> {
        self.entity_column.as_deref()
    }

    pub fn rows(&self) -> &[FlattenedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names of the tabular form
    pub fn header(&self) -> Vec<String> {
        let mut header = positional_header(self.window_length);
        if let Some(entity) = &self.entity_column {
            header.push(entity.clone());
        }
        header
    }

    /// Cell values of `row` in [`header`](Self::header) order
    pub fn record(&self, row: &FlattenedRow) -> Vec<String> {
        let mut record = Vec::with_capacity(3 * self.window_length + 2);
        for series in row.axes() {
            record.extend(series.iter().map(|v| v.to_string()));
        }
        record.push(row.time.clone());
        if self.entity_column.is_some() {
            record.push(row.entity.clone().unwrap_or_default());
        }
        record
    }

    /// Rebuild a table from tabular records (e.g. a CSV written elsewhere)
    ///
    /// Positional columns are looked up by name, so column order does not
    /// matter; a missing or non-numeric positional cell is a shape error.
    pub fn from_records(
        columns: &[String],
        records: &[Vec<String>],
        window_length: usize,
        entity_column: Option<&str>,
    ) -> Result<Self> {
        let layout = PositionalLayout::resolve(columns, window_length, entity_column)?;
        let mut table = Self::new(window_length);
        if let Some((name, _)) = &layout.entity {
            table.entity_column = Some(name.clone());
        }

        for (row_idx, record) in records.iter().enumerate() {
            let row = layout.parse_row(record, row_idx)?;
            table.push(row)?;
        }
        Ok(table)
    }
}

/// Names `x_1..x_W, y_1..y_W, z_1..z_W, Time`
pub fn positional_header(window_length: usize) -> Vec<String> {
    let mut header = Vec::with_capacity(3 * window_length + 1);
    for prefix in AXIS_PREFIXES {
        header.extend((1..=window_length).map(|i| format!("{}_{}", prefix, i)));
    }
    header.push(TIME_FIELD.to_string());
    header
}

/// Column positions of a flattened table read from foreign input
struct PositionalLayout {
    axes: [Vec<usize>; 3],
    time: usize,
    entity: Option<(String, usize)>,
}

impl PositionalLayout {
    fn resolve(columns: &[String], window_length: usize, entity_column: Option<&str>) -> Result<Self> {
        let index = ColumnIndex::new(columns);
        let lookup = |name: &str| {
            index
                .find(name)
                .ok_or_else(|| Error::shape(format!("flattened input is missing field '{}'", name)))
        };

        let mut axes: [Vec<usize>; 3] = Default::default();
        for (slot, prefix) in axes.iter_mut().zip(AXIS_PREFIXES) {
            *slot = (1..=window_length)
                .map(|i| lookup(&format!("{}_{}", prefix, i)))
                .collect::<Result<_>>()?;
        }

        Ok(Self {
            axes,
            time: lookup(TIME_FIELD)?,
            entity: entity_column
                .and_then(|name| index.find(name).map(|idx| (columns[idx].clone(), idx))),
        })
    }

    fn parse_row(&self, record: &[String], row_idx: usize) -> Result<FlattenedRow> {
        let cell = |idx: usize| record_cell(record, idx, row_idx);

        let mut series: [Vec<f64>; 3] = Default::default();
        for ((values, positions), prefix) in series.iter_mut().zip(&self.axes).zip(AXIS_PREFIXES) {
            *values = positions
                .iter()
                .enumerate()
                .map(|(i, &idx)| {
                    let text = cell(idx)?;
                    text.trim().parse::<f64>().map_err(|_| {
                        Error::shape(format!(
                            "row {}: field '{}_{}' is not numeric ('{}')",
                            row_idx,
                            prefix,
                            i + 1,
                            text
                        ))
                    })
                })
                .collect::<Result<_>>()?;
        }

        let entity = match &self.entity {
            Some((_, idx)) => Some(cell(*idx)?.trim().to_string()).filter(|v| !v.is_empty()),
            None => None,
        };

        let [x, y, z] = series;
        Ok(FlattenedRow {
            x,
            y,
            z,
            time: cell(self.time)?.to_string(),
            entity,
        })
    }
}

fn record_cell(record: &[String], idx: usize, row_idx: usize) -> Result<&str> {
    record.get(idx).map(String::as_str).ok_or_else(|| {
        Error::shape(format!(
            "row {}: record has {} fields, needed column {}",
            row_idx,
            record.len(),
            idx + 1
        ))
    })
}

/// A flattened window with its predicted behaviour
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub window: FlattenedRow,
    pub behaviour: String,
    /// Probability of the winning class
    pub confidence: f64,
}

/// Ordered labeled windows
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    window_length: usize,
    entity_column: Option<String>,
    rows: Vec<LabeledRow>,
}

impl LabeledTable {
    pub fn new(window_length: usize, entity_column: Option<String>) -> Self {
        Self {
            window_length,
            entity_column,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: LabeledRow) -> Result<()> {
        row.window.check_length(self.window_length, self.rows.len())?;
        self.rows.push(row);
        Ok(())
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn entity_column(&self) -> Option<&str> {
        self.entity_column.as_deref()
    }

    pub fn rows(&self) -> &[LabeledRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Flattened header followed by `behaviour, confidence`
    pub fn header(&self) -> Vec<String> {
        let mut header = self.flattened_shape().header();
        header.push(BEHAVIOUR_FIELD.to_string());
        header.push(CONFIDENCE_FIELD.to_string());
        header
    }

    pub fn record(&self, row: &LabeledRow) -> Vec<String> {
        let mut record = self.flattened_shape().record(&row.window);
        record.push(row.behaviour.clone());
        record.push(row.confidence.to_string());
        record
    }

    /// Rebuild a labeled table from tabular records
    pub fn from_records(
        columns: &[String],
        records: &[Vec<String>],
        window_length: usize,
        entity_column: Option<&str>,
    ) -> Result<Self> {
        let layout = PositionalLayout::resolve(columns, window_length, entity_column)?;
        let index = ColumnIndex::new(columns);
        let behaviour_idx = index.resolve(BEHAVIOUR_FIELD, &["behavior", "label"])?;
        let confidence_idx = index.resolve(CONFIDENCE_FIELD, &[])?;

        let mut table = Self::new(
            window_length,
            layout.entity.as_ref().map(|(name, _)| name.clone()),
        );

        for (row_idx, record) in records.iter().enumerate() {
            let window = layout.parse_row(record, row_idx)?;
            let field = |idx: usize, name: &str| {
                record.get(idx).ok_or_else(|| {
                    Error::shape(format!("row {}: record is missing '{}'", row_idx, name))
                })
            };
            let behaviour = field(behaviour_idx, BEHAVIOUR_FIELD)?.trim().to_string();
            let confidence_text = field(confidence_idx, CONFIDENCE_FIELD)?;
            let confidence = confidence_text.trim().parse::<f64>().map_err(|_| {
                Error::shape(format!(
                    "row {}: confidence '{}' is not numeric",
                    row_idx, confidence_text
                ))
            })?;

            table.push(LabeledRow {
                window,
                behaviour,
                confidence,
            })?;
        }
        Ok(table)
    }

    fn flattened_shape(&self) -> FlattenedTable {
        FlattenedTable {
            window_length: self.window_length,
            entity_column: self.entity_column.clone(),
            rows: Vec::new(),
        }
    }
}
