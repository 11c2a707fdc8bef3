//! Plain CSV ingestion
//!
//! Reads a header row plus data rows into [`SampleTable`]s, either all at
//! once or in fixed-size chunks of raw rows for streaming.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::{normalize_cell, SampleTable};

fn reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.trim(csv::Trim::All).flexible(false);
    builder
}

fn header_of<R: Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    Ok(reader.headers()?.iter().map(|h| h.trim().to_string()).collect())
}

fn push_record(table: &mut SampleTable, record: &csv::StringRecord) -> Result<()> {
    table.push_row(record.iter().map(normalize_cell).collect())
}

/// Read a whole CSV document into one table
pub fn read_csv_table<R: Read>(source: R) -> Result<SampleTable> {
    let mut reader = reader_builder().from_reader(source);
    let mut table = SampleTable::new(header_of(&mut reader)?);

    for record in reader.records() {
        push_record(&mut table, &record?)?;
    }

    Ok(table)
}

/// Read a whole CSV file into one table
pub fn read_csv_file(path: &Path) -> Result<SampleTable> {
    let file = File::open(path)?;
    let table = read_csv_table(file)?;
    debug!(path = %path.display(), rows = table.len(), "Read CSV file");
    Ok(table)
}

/// Iterator over consecutive chunks of at most `chunk_size` raw CSV rows
///
/// Every chunk shares the file's header. Nothing is filtered here: null rows
/// count toward the chunk size.
pub struct CsvChunks<R: Read> {
    reader: csv::Reader<R>,
    columns: Vec<String>,
    chunk_size: usize,
    record: csv::StringRecord,
    rows_read: usize,
    done: bool,
}

impl CsvChunks<File> {
    /// Open `path` for chunked reading
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        Self::from_reader(File::open(path)?, chunk_size)
    }
}

impl<R: Read> CsvChunks<R> {
    pub fn from_reader(source: R, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::configuration("chunk_size must be at least 1"));
        }
        let mut reader = reader_builder().from_reader(source);
        let columns = header_of(&mut reader)?;
        Ok(Self {
            reader,
            columns,
            chunk_size,
            record: csv::StringRecord::new(),
            rows_read: 0,
            done: false,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_chunk(&mut self) -> Result<Option<SampleTable>> {
        let mut table =
            SampleTable::new(self.columns.iter().cloned()).with_first_row(self.rows_read);
        while table.len() < self.chunk_size {
            if !self.reader.read_record(&mut self.record)? {
                self.done = true;
                break;
            }
            push_record(&mut table, &self.record)?;
        }
        self.rows_read += table.len();

        if table.is_empty() {
            Ok(None)
        } else {
            Ok(Some(table))
        }
    }
}

impl<R: Read> Iterator for CsvChunks<R> {
    type Item = Result<SampleTable>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(table)) => Some(Ok(table)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
