//! Flattened and labeled CSV export
//!
//! The header is always written, so a run that produces no windows still
//! leaves a valid, empty table behind. Streaming output goes to a temporary
//! file beside the target and is renamed into place only once every chunk
//! has been windowed; a failed run leaves nothing at the output path.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::ingest::CsvChunks;
use crate::records::{FlattenedTable, LabeledTable};
use crate::table::{AxisColumns, ColumnIndex};
use crate::windower::{validate_chunking, window_with, WindowSpec};

/// Suffix added to the input stem for the default output name
pub const FLATTENED_SUFFIX: &str = "__flattened";

/// Streaming writer for flattened windows
pub struct FlattenedCsvWriter<W: Write> {
    writer: csv::Writer<W>,
    rows_written: usize,
}

impl<W: Write> FlattenedCsvWriter<W> {
    /// Wrap `sink` and write `header` immediately
    pub fn new(sink: W, header: &[String]) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(sink);
        writer.write_record(header)?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Append every row of `table`
    pub fn write_table(&mut self, table: &FlattenedTable) -> Result<()> {
        for row in table.rows() {
            self.writer.write_record(table.record(row))?;
        }
        self.rows_written += table.len();
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Flush buffered rows and return the row count
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

pub fn write_flattened<W: Write>(table: &FlattenedTable, sink: W) -> Result<()> {
    let mut writer = FlattenedCsvWriter::new(sink, &table.header())?;
    writer.write_table(table)?;
    writer.finish()?;
    Ok(())
}

pub fn write_flattened_file(table: &FlattenedTable, path: &Path) -> Result<()> {
    write_flattened(table, File::create(path)?)
}

pub fn write_labeled<W: Write>(table: &LabeledTable, sink: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(table.header())?;
    for row in table.rows() {
        writer.write_record(table.record(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_labeled_file(table: &LabeledTable, path: &Path) -> Result<()> {
    write_labeled(table, File::create(path)?)
}

fn read_records<R: Read>(source: R) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(source);
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_string).collect());
    }
    Ok((columns, records))
}

/// Read a flattened table back from CSV
pub fn read_flattened<R: Read>(
    source: R,
    window_length: usize,
    entity_column: Option<&str>,
) -> Result<FlattenedTable> {
    let (columns, records) = read_records(source)?;
    FlattenedTable::from_records(&columns, &records, window_length, entity_column)
}

/// Read a labeled table back from CSV
pub fn read_labeled<R: Read>(
    source: R,
    window_length: usize,
    entity_column: Option<&str>,
) -> Result<LabeledTable> {
    let (columns, records) = read_records(source)?;
    LabeledTable::from_records(&columns, &records, window_length, entity_column)
}

pub fn read_labeled_file(
    path: &Path,
    window_length: usize,
    entity_column: Option<&str>,
) -> Result<LabeledTable> {
    let table = read_labeled(File::open(path)?, window_length, entity_column)?;
    debug!(path = %path.display(), rows = table.len(), "Read labeled CSV");
    Ok(table)
}

/// `<dir>/<stem>__flattened.csv` next to `input`
pub fn default_flattened_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}{}.csv", stem, FLATTENED_SUFFIX))
}

/// Stream-flatten a CSV file, returning the number of windows written
pub fn flatten_file(
    input: &Path,
    output: &Path,
    chunk_size: usize,
    window_length: usize,
    time_column: &str,
) -> Result<usize> {
    let spec = WindowSpec::new(window_length, time_column)?;
    flatten_file_with(input, output, chunk_size, &spec)
}

/// [`flatten_file`] with an explicit [`WindowSpec`] (e.g. to carry an entity column)
///
/// Chunk sizing is checked before the input is opened, and `output` may not
/// be the input file. Each chunk of `chunk_size` raw rows is windowed on its
/// own; `output` is replaced only when every chunk succeeds.
pub fn flatten_file_with(
    input: &Path,
    output: &Path,
    chunk_size: usize,
    spec: &WindowSpec,
) -> Result<usize> {
    validate_chunking(chunk_size, spec.window_length())?;
    if is_same_file(input, output)? {
        return Err(Error::configuration(format!(
            "output {} is the input file",
            output.display()
        )));
    }

    let chunks = CsvChunks::open(input, chunk_size)?;

    let index = ColumnIndex::new(chunks.columns());
    AxisColumns::resolve(&index, spec.time_column())?;
    let mut shape = FlattenedTable::new(spec.window_length());
    if let Some(idx) = spec.entity_column().and_then(|name| index.find(name)) {
        shape = shape.with_entity_column(chunks.columns()[idx].clone());
    }

    let mut staging = NamedTempFile::new_in(parent_dir(output))?;
    let mut writer = FlattenedCsvWriter::new(&mut staging, &shape.header())?;
    for (chunk_idx, chunk) in chunks.enumerate() {
        let chunk = chunk?;
        let windows = window_with(&chunk, spec)?;
        debug!(
            chunk = chunk_idx,
            first_row = chunk.first_row(),
            rows = chunk.len(),
            windows = windows.len(),
            "Flattened chunk"
        );
        writer.write_table(&windows)?;
    }
    let written = writer.finish()?;
    staging.persist(output).map_err(|e| e.error)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        windows = written,
        "Saved flattened windows"
    );
    Ok(written)
}

/// Directory a temporary file must live in to be renamed onto `path`
fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// True when `output` already exists and resolves to the same file as `input`
fn is_same_file(input: &Path, output: &Path) -> Result<bool> {
    let Ok(output) = output.canonicalize() else {
        return Ok(false);
    };
    Ok(input.canonicalize()? == output)
}
