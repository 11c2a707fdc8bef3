//! Timestamp utilities
//!
//! Sensor exports carry timestamps in many shapes: RFC 3339, spreadsheet-style
//! `MM/DD/YYYY` text, or bare epoch numbers. [`TimestampParser`] accepts all of
//! them and normalizes to UTC. Naive timestamps (no offset) are interpreted in
//! the parser's configured source offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};

use crate::{Error, Result};

/// Formats carrying their own UTC offset
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Formats without an offset (interpreted in the source offset)
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
    "%Y%m%d%H%M%S",
];

/// Compact `%Y%m%d` forms are tried ahead of the epoch fallback
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Parses timestamp text into UTC instants
#[derive(Debug, Clone, Copy)]
pub struct TimestampParser {
    source_offset: FixedOffset,
}

impl TimestampParser {
    /// Parser interpreting naive timestamps in `source_offset`
    pub fn new(source_offset: FixedOffset) -> Self {
        Self { source_offset }
    }

    /// Parser interpreting naive timestamps as UTC
    pub fn utc() -> Self {
        Self::new(utc_offset())
    }

    pub fn source_offset(&self) -> FixedOffset {
        self.source_offset
    }

    /// Parse `raw` into a UTC instant
    ///
    /// Tried in order: RFC 3339, offset-bearing formats, naive date-times,
    /// bare dates (midnight), numeric epoch values. Compact `YYYYMMDD` digits
    /// read as a date whenever they form a valid one.
    pub fn parse(&self, raw: &str) -> Result<DateTime<Utc>> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(invalid(raw, "empty timestamp"));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(dt.with_timezone(&Utc));
        }

        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(value, format) {
                return Ok(dt.with_timezone(&Utc));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
                return self.localize(naive, raw);
            }
        }

        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(value, format) {
                if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                    return self.localize(naive, raw);
                }
            }
        }

        if let Ok(epoch) = value.parse::<f64>() {
            return epoch_to_utc(epoch, raw);
        }

        Err(invalid(raw, "unrecognized timestamp format"))
    }

    /// Parse `raw` into nanoseconds since the Unix epoch (UTC)
    pub fn parse_nanos(&self, raw: &str) -> Result<i64> {
        self.parse(raw)?
            .timestamp_nanos_opt()
            .ok_or_else(|| invalid(raw, "outside the nanosecond-representable range"))
    }

    fn localize(&self, naive: NaiveDateTime, raw: &str) -> Result<DateTime<Utc>> {
        self.source_offset
            .from_local_datetime(&naive)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| invalid(raw, "ambiguous local time"))
    }
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self::utc()
    }
}

/// Parse a UTC offset such as `+02:00`, `-0530`, `Z` or `UTC`
pub fn parse_utc_offset(text: &str) -> Result<FixedOffset> {
    let value = text.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return Ok(utc_offset());
    }

    let bad = || Error::Config(format!("Invalid UTC offset '{}' (expected e.g. +02:00)", text));

    let (sign, rest) = match value.chars().next() {
        Some('+') => (1, &value[1..]),
        Some('-') => (-1, &value[1..]),
        _ => return Err(bad()),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad());
    }

    let hours: i32 = digits[..2].parse().map_err(|_| bad())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| bad())?;
    if minutes >= 60 {
        return Err(bad());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(bad)
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

/// Convert a numeric epoch into UTC, picking the unit by magnitude
///
/// |v| >= 1e17 is nanoseconds, >= 1e14 microseconds, >= 1e11 milliseconds,
/// anything smaller is seconds.
fn epoch_to_utc(epoch: f64, raw: &str) -> Result<DateTime<Utc>> {
    if !epoch.is_finite() {
        return Err(invalid(raw, "non-finite epoch value"));
    }

    let magnitude = epoch.abs();
    let nanos_per_unit = if magnitude >= 1e17 {
        1.0
    } else if magnitude >= 1e14 {
        1_000.0
    } else if magnitude >= 1e11 {
        1_000_000.0
    } else {
        NANOS_PER_SECOND
    };

    let total_nanos = epoch * nanos_per_unit;
    if total_nanos.abs() >= i64::MAX as f64 {
        return Err(invalid(raw, "epoch value out of range"));
    }

    let secs = total_nanos.div_euclid(NANOS_PER_SECOND) as i64;
    let subsec = total_nanos.rem_euclid(NANOS_PER_SECOND).round() as u32;
    // rounding can push the fraction to a full second
    let (secs, subsec) = if subsec >= 1_000_000_000 {
        (secs + 1, 0)
    } else {
        (secs, subsec)
    };

    DateTime::from_timestamp(secs, subsec).ok_or_else(|| invalid(raw, "epoch value out of range"))
}

fn invalid(raw: &str, reason: &str) -> Error {
    Error::InvalidTimestamp {
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}
