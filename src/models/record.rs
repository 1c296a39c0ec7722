use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp of one data row, at the schema's time granularity. Always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timestamp {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Timestamp {
    /// Shift by `steps` units of the timestamp's own granularity
    /// (days for dates, hours for date-times).
    pub fn offset(&self, steps: usize) -> Self {
        match self {
            Timestamp::Date(d) => Timestamp::Date(*d + Duration::days(steps as i64)),
            Timestamp::DateTime(dt) => Timestamp::DateTime(*dt + Duration::hours(steps as i64)),
        }
    }

    pub fn to_datetime(&self) -> NaiveDateTime {
        match self {
            Timestamp::Date(d) => d.and_time(chrono::NaiveTime::MIN),
            Timestamp::DateTime(dt) => *dt,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Timestamp::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// A decoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f32),
}

/// Parse a finite decimal number written with `decimal_separator`.
pub fn parse_decimal(text: &str, decimal_separator: &str) -> Option<f32> {
    let parsed = if decimal_separator.is_empty() || decimal_separator == "." {
        text.parse::<f32>().ok()
    } else {
        text.replace(decimal_separator, ".").parse::<f32>().ok()
    };
    parsed.filter(|v| v.is_finite())
}

impl FieldValue {
    /// Numeric view of the value; text is parsed after trimming.
    pub fn as_f32(&self, decimal_separator: &str) -> Option<f32> {
        match self {
            FieldValue::Integer(i) => Some(*i as f32),
            FieldValue::Float(f) => Some(*f),
            FieldValue::Text(s) => parse_decimal(s.trim(), decimal_separator),
        }
    }
}

/// Outcome of decoding one variable slot of a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Value(f32),
    /// Flag rejected, or the value equals a missing-value sentinel
    Missing,
    /// The slot could not be decoded
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Index into the schema's variable rules
    pub variable: usize,
    /// Replica index, 0 for non-replicated variables
    pub replica: usize,
    pub timestamp: Timestamp,
    pub reading: Reading,
}

/// Everything decoded from one data line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    /// Only set for multi-point files
    pub point_code: Option<String>,
    pub timestamp: Timestamp,
    pub observations: Vec<Observation>,
}

impl ParsedRecord {
    pub fn error_count(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.reading == Reading::Error)
            .count()
    }
}

/// One output tuple handed to a data sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub timestamp: Timestamp,
    pub variable_code: i32,
    pub value: f32,
}

impl ObservationRow {
    pub fn new(timestamp: Timestamp, variable_code: i32, value: f32) -> Self {
        Self {
            timestamp,
            variable_code,
            value,
        }
    }
}

impl fmt::Display for ObservationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "('{}',{},{})",
            self.timestamp, self.variable_code, self.value
        )
    }
}
