//! Time-series points and the sink they are written to
//!
//! A [`Point`] is one labeled window on its way to the database: a
//! measurement name, optional tags, the `behaviour`/`confidence` fields and a
//! nanosecond UTC timestamp. [`PointSink`] is the narrow write interface the
//! pipeline needs; [`crate::influx::InfluxClient`] is the production
//! implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::records::{BEHAVIOUR_FIELD, CONFIDENCE_FIELD};

/// Tag key for the animal id
pub const SHEEP_ID_TAG: &str = "sheep_id";

/// One labeled window ready for persistence
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    /// Tags, kept sorted by key
    pub tags: BTreeMap<String, String>,
    pub behaviour: String,
    pub confidence: f64,
    /// Nanoseconds since the Unix epoch, UTC
    pub timestamp_ns: i64,
}

impl Point {
    pub fn new(
        measurement: impl Into<String>,
        behaviour: impl Into<String>,
        confidence: f64,
        timestamp_ns: i64,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            behaviour: behaviour.into(),
            confidence,
            timestamp_ns,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Render as one line of InfluxDB line protocol
    ///
    /// `measurement[,tag=value...] behaviour="...",confidence=<f64> <ns>`
    pub fn to_line_protocol(&self) -> String {
        let mut line = escape_measurement(&self.measurement);
        for (key, value) in &self.tags {
            line.push(',');
            line.push_str(&escape_tag(key));
            line.push('=');
            line.push_str(&escape_tag(value));
        }
        line.push(' ');
        line.push_str(BEHAVIOUR_FIELD);
        line.push_str("=\"");
        line.push_str(&escape_string_field(&self.behaviour));
        line.push_str("\",");
        line.push_str(CONFIDENCE_FIELD);
        line.push('=');
        line.push_str(&self.confidence.to_string());
        line.push(' ');
        line.push_str(&self.timestamp_ns.to_string());
        line
    }
}

/// Destination for batches of points
#[async_trait]
pub trait PointSink: Send + Sync {
    /// Write every point in one call; the batch succeeds or fails as a whole
    async fn write_points(&self, points: &[Point]) -> Result<()>;
}

fn escape_with(text: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        // Line protocol has no escape for line breaks
        let c = if c == '\n' || c == '\r' { ' ' } else { c };
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_measurement(text: &str) -> String {
    escape_with(text, &[',', ' '])
}

fn escape_tag(text: &str) -> String {
    escape_with(text, &[',', '=', ' '])
}

fn escape_string_field(text: &str) -> String {
    escape_with(text, &['"', '\\'])
}
