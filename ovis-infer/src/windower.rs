//! Fixed-length windowing of accelerometer samples
//!
//! Rows with a missing X, Y, Z or time value are dropped first. The remaining
//! rows are cut into consecutive, non-overlapping windows of exactly
//! `window_length` samples; a short tail is discarded, never padded. Each
//! window becomes one [`FlattenedRow`] stamped with its **last** sample's time.
//!
//! In chunked mode every chunk is windowed on its own, so a window never spans
//! a chunk boundary and each chunk's tail remainder is lost. The chunk size
//! must therefore be an exact multiple of the window length.

use tracing::debug;

use crate::error::{Error, Result};
use crate::records::{FlattenedRow, FlattenedTable};
use crate::table::{AxisColumns, SampleTable};

/// Windowing parameters
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    window_length: usize,
    time_column: String,
    entity_column: Option<String>,
}

impl WindowSpec {
    pub fn new(window_length: usize, time_column: impl Into<String>) -> Result<Self> {
        if window_length == 0 {
            return Err(Error::configuration("window_length must be at least 1"));
        }
        Ok(Self {
            window_length,
            time_column: time_column.into(),
            entity_column: None,
        })
    }

    /// Carry this column's value (last sample of each window) into the output
    pub fn with_entity_column(mut self, name: impl Into<String>) -> Self {
        self.entity_column = Some(name.into());
        self
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn time_column(&self) -> &str {
        &self.time_column
    }

    pub fn entity_column(&self) -> Option<&str> {
        self.entity_column.as_deref()
    }
}

/// Reject chunk sizes that would split windows
pub fn validate_chunking(chunk_size: usize, window_length: usize) -> Result<()> {
    if window_length == 0 {
        return Err(Error::configuration("window_length must be at least 1"));
    }
    if chunk_size == 0 || chunk_size % window_length != 0 {
        return Err(Error::configuration(format!(
            "chunk_size ({}) must be a positive multiple of window_length ({})",
            chunk_size, window_length
        )));
    }
    Ok(())
}

/// Window `table` without entity tracking
pub fn window(table: &SampleTable, window_length: usize, time_column: &str) -> Result<FlattenedTable> {
    window_with(table, &WindowSpec::new(window_length, time_column)?)
}

/// Window `table` with explicit [`WindowSpec`] settings
pub fn window_with(table: &SampleTable, spec: &WindowSpec) -> Result<FlattenedTable> {
    let index = table.column_index();
    let columns = AxisColumns::resolve(&index, spec.time_column())?;
    let entity_idx = spec.entity_column().and_then(|name| index.find(name));

    let mut output = FlattenedTable::new(spec.window_length());
    if let Some(idx) = entity_idx {
        output = output.with_entity_column(table.columns()[idx].clone());
    }

    let samples = usable_samples(table, &columns, entity_idx)?;
    let usable = (samples.len() / spec.window_length()) * spec.window_length();

    for group in samples[..usable].chunks_exact(spec.window_length()) {
        output.push(flatten_group(group))?;
    }

    debug!(
        input_rows = table.len(),
        usable_rows = samples.len(),
        windows = output.len(),
        dropped_tail = samples.len() - usable,
        "Windowed sample table"
    );

    Ok(output)
}

/// Window a sequence of chunks independently and concatenate the results
///
/// Chunk sizing is validated before the first chunk is pulled.
pub fn window_chunks<I>(chunks: I, spec: &WindowSpec, chunk_size: usize) -> Result<FlattenedTable>
where
    I: IntoIterator<Item = Result<SampleTable>>,
{
    validate_chunking(chunk_size, spec.window_length())?;

    let mut output: Option<FlattenedTable> = None;
    for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
        let windows = window_with(&chunk?, spec)?;
        debug!(chunk = chunk_idx, windows = windows.len(), "Windowed chunk");
        match output.as_mut() {
            Some(acc) => acc.append(windows)?,
            None => output = Some(windows),
        }
    }

    Ok(output.unwrap_or_else(|| FlattenedTable::new(spec.window_length())))
}

/// One filtered input row
struct Sample<'a> {
    x: f64,
    y: f64,
    z: f64,
    time: &'a str,
    entity: Option<&'a str>,
}

fn usable_samples<'a>(
    table: &'a SampleTable,
    columns: &AxisColumns,
    entity_idx: Option<usize>,
) -> Result<Vec<Sample<'a>>> {
    let names = table.columns();
    let mut samples = Vec::with_capacity(table.len());

    for (row_idx, row) in table.rows().iter().enumerate() {
        let (Some(x), Some(y), Some(z), Some(time)) = (
            row[columns.x].as_deref(),
            row[columns.y].as_deref(),
            row[columns.z].as_deref(),
            row[columns.time].as_deref(),
        ) else {
            continue;
        };

        let numeric = |text: &str, idx: usize| {
            text.trim().parse::<f64>().map_err(|_| Error::NonNumeric {
                column: names[idx].clone(),
                row: table.first_row() + row_idx,
                value: text.to_string(),
            })
        };

        samples.push(Sample {
            x: numeric(x, columns.x)?,
            y: numeric(y, columns.y)?,
            z: numeric(z, columns.z)?,
            time,
            entity: entity_idx.and_then(|idx| row[idx].as_deref()),
        });
    }

    Ok(samples)
}

fn flatten_group(group: &[Sample<'_>]) -> FlattenedRow {
    // group is never empty: chunks_exact with window_length >= 1
    let last = &group[group.len() - 1];
    FlattenedRow {
        x: group.iter().map(|s| s.x).collect(),
        y: group.iter().map(|s| s.y).collect(),
        z: group.iter().map(|s| s.z).collect(),
        time: last.time.to_string(),
        entity: last.entity.map(str::to_string),
    }
}
