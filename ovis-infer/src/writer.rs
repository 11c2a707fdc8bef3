//! Labeled rows to sink points
//!
//! Each row's `Time` is parsed and normalized to UTC nanoseconds. Rows whose
//! timestamp cannot be parsed are logged and dropped; the rest are written in
//! a single batch.

use ovis_common::TimestampParser;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::records::LabeledTable;
use crate::sink::{Point, PointSink, SHEEP_ID_TAG};

/// Build one point per row with a parseable timestamp
///
/// Rows that fail to parse are returned as [`Error::TimestampParse`] values
/// alongside the points so the caller can decide how to report them.
pub fn build_points(
    table: &LabeledTable,
    measurement: &str,
    entity_tag_column: Option<&str>,
    parser: &TimestampParser,
) -> (Vec<Point>, Vec<Error>) {
    let tag_entity = match (entity_tag_column, table.entity_column()) {
        (Some(wanted), Some(present)) => wanted.eq_ignore_ascii_case(present),
        _ => false,
    };

    let mut points = Vec::with_capacity(table.len());
    let mut skipped = Vec::new();

    for (row_idx, row) in table.rows().iter().enumerate() {
        let timestamp_ns = match parser.parse_nanos(&row.window.time) {
            Ok(ns) => ns,
            Err(e) => {
                debug!(row = row_idx, value = %row.window.time, error = %e, "Skipping row with bad timestamp");
                skipped.push(Error::TimestampParse {
                    row: row_idx,
                    value: row.window.time.clone(),
                });
                continue;
            }
        };

        let mut point = Point::new(measurement, &row.behaviour, row.confidence, timestamp_ns);
        if tag_entity {
            if let Some(id) = row.window.entity.as_deref().filter(|v| is_truthy(v)) {
                point = point.with_tag(SHEEP_ID_TAG, id.trim());
            }
        }
        points.push(point);
    }

    (points, skipped)
}

/// Write `table` to `sink`, returning the number of points submitted
///
/// When no row has a usable timestamp the sink is not called and 0 is
/// returned. Sink failures are returned unchanged.
pub async fn persist<S>(
    table: &LabeledTable,
    sink: &S,
    measurement: &str,
    entity_tag_column: Option<&str>,
    parser: &TimestampParser,
) -> Result<usize>
where
    S: PointSink + ?Sized,
{
    let (points, skipped) = build_points(table, measurement, entity_tag_column, parser);

    if !skipped.is_empty() {
        warn!(
            skipped = skipped.len(),
            total = table.len(),
            "Dropped rows with unparseable timestamps"
        );
    }

    if points.is_empty() {
        info!(rows = table.len(), "No valid rows to write");
        return Ok(0);
    }

    sink.write_points(&points).await?;

    info!(points = points.len(), measurement, "Persisted labeled windows");
    Ok(points.len())
}

/// Entity values that produce a tag: non-empty and not numeric zero
fn is_truthy(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    match trimmed.parse::<f64>() {
        Ok(number) => number != 0.0,
        Err(_) => true,
    }
}
