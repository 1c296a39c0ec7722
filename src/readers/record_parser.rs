use crate::error::{ProcessingError, Result};
use crate::models::record::parse_decimal;
use crate::models::{
    FieldDescriptor, FieldFormat, FieldValue, FormatKind, Granularity, Observation,
    ParsedRecord, PointCodeOrigin, Reading, SchemaModel, Timestamp, VariableRule,
};
use crate::utils::constants::INVALID_YEAR;
use crate::utils::date_pattern::{parse_date, parse_datetime};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::path::Path;
use thiserror::Error;

/// Why a single field could not be decoded. Never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    #[error("empty field")]
    Empty,

    #[error("not a number: '{0}'")]
    NotANumber(String),

    #[error("unsupported value format: {0}")]
    UnsupportedFormat(String),
}

/// Character-based substring, `count` of `None` meaning "to the end".
/// Out-of-range windows yield an empty slice.
pub fn slice_chars(text: &str, start: usize, count: Option<usize>) -> &str {
    let mut offsets = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));

    let Some(begin) = offsets.nth(start) else {
        return "";
    };

    match count {
        None => &text[begin..],
        Some(0) => "",
        Some(n) => {
            let end = offsets.nth(n - 1).unwrap_or(text.len());
            &text[begin..end]
        }
    }
}

/// Round through the decimal text representation, the way the station
/// stores have always received these values. Exact ties go away from zero.
pub fn round_via_text(value: f32, decimals: usize) -> f32 {
    let longer = format!("{:.*}", decimals + 1, value);
    let exact_tie = longer.ends_with('5') && longer.parse::<f64>() == Ok(f64::from(value));

    let text = if exact_tie {
        let kept = longer[..longer.len() - 1].trim_end_matches('.');
        increment_last_digit(kept)
    } else {
        format!("{:.*}", decimals, value)
    };

    text.parse::<f32>().unwrap_or(value)
}

/// Add one unit in the last place to the magnitude of a decimal string
fn increment_last_digit(text: &str) -> String {
    let (sign, magnitude) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let mut digits = magnitude.as_bytes().to_vec();

    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        match *digit {
            b'.' => continue,
            b'9' => *digit = b'0',
            d => {
                *digit = d + 1;
                carry = false;
                break;
            }
        }
    }
    if carry {
        digits.insert(0, b'1');
    }

    format!("{}{}", sign, String::from_utf8_lossy(&digits))
}

/// Decode replica `replica` of `field` from `text`.
pub fn extract_field_value(
    text: &str,
    replica: usize,
    field: &FieldDescriptor,
) -> std::result::Result<FieldValue, FieldError> {
    extract_field_value_with_separator(text, replica, field, ".")
}

pub fn extract_field_value_with_separator(
    text: &str,
    replica: usize,
    field: &FieldDescriptor,
    decimal_separator: &str,
) -> std::result::Result<FieldValue, FieldError> {
    let (start, count) = field.window(replica);
    let slice = slice_chars(text, start, count);
    let trimmed = slice.trim();

    if trimmed.is_empty() {
        return Err(FieldError::Empty);
    }

    match &field.format {
        FieldFormat::Text => Ok(FieldValue::Text(slice.to_string())),
        // invalid integers read as zero; stores depend on this
        FieldFormat::Integer => Ok(FieldValue::Integer(trimmed.parse::<i64>().unwrap_or(0))),
        FieldFormat::Float { decimals } => {
            let value = parse_decimal(trimmed, decimal_separator)
                .ok_or_else(|| FieldError::NotANumber(trimmed.to_string()))?;
            Ok(FieldValue::Float(match decimals {
                Some(n) => round_via_text(value, *n),
                None => value,
            }))
        }
        FieldFormat::Pattern(p) => Err(FieldError::UnsupportedFormat(p.clone())),
    }
}

/// Decodes data lines according to one schema.
pub struct RecordParser<'a> {
    schema: &'a SchemaModel,
    kind: FormatKind,
    granularity: Granularity,
}

impl<'a> RecordParser<'a> {
    pub fn new(schema: &'a SchemaModel) -> Result<Self> {
        let (kind, granularity) = schema.check_importable()?;
        Ok(Self {
            schema,
            kind,
            granularity,
        })
    }

    pub fn schema(&self) -> &SchemaModel {
        self.schema
    }

    pub fn kind(&self) -> FormatKind {
        self.kind
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        line.split(self.schema.format.delimiter.as_str()).collect()
    }

    fn field_value(
        &self,
        text: &str,
        replica: usize,
        field: &FieldDescriptor,
    ) -> std::result::Result<FieldValue, FieldError> {
        extract_field_value_with_separator(
            text,
            replica,
            field,
            &self.schema.format.decimal_separator,
        )
    }

    /// Point code from a data line, or from a file base name for
    /// filename-defined codes. `None` when it cannot be found.
    pub fn extract_point_code(&self, text: &str) -> Option<String> {
        let origin = self.schema.point_code.origin?;
        let field = &self.schema.point_code.field;

        let code = if self.kind == FormatKind::Fixed || origin == PointCodeOrigin::FilenameDefined
        {
            if field.format != FieldFormat::Text {
                return None;
            }
            let (start, count) = field.window(0);
            slice_chars(text, start, count)
        } else {
            let fields = self.split(text);
            let index = if self.schema.format.is_single_point {
                field.position.unwrap_or(0)
            } else {
                field.position?.checked_sub(1)?
            };
            fields.get(index).copied()?
        };

        let code = code.trim();
        (!code.is_empty()).then(|| code.to_string())
    }

    /// Parse a date with the schema's time pattern. The sentinel year
    /// counts as not found.
    pub fn extract_date(&self, text: &str) -> Option<NaiveDate> {
        parse_date(text.trim(), self.schema.time.pattern()).filter(|d| d.year() != INVALID_YEAR)
    }

    pub fn extract_datetime(&self, text: &str) -> Option<NaiveDateTime> {
        parse_datetime(text.trim(), self.schema.time.pattern())
            .filter(|dt| dt.year() != INVALID_YEAR)
    }

    fn timestamp_from(&self, text: &str) -> Option<Timestamp> {
        match self.granularity {
            Granularity::Daily => self.extract_date(text).map(Timestamp::Date),
            Granularity::Hourly => self.extract_datetime(text).map(Timestamp::DateTime),
        }
    }

    /// Timestamp of a data line at the schema's granularity
    pub fn extract_timestamp(&self, line: &str) -> Option<Timestamp> {
        let field = &self.schema.time.field;
        let text = match self.kind {
            FormatKind::Fixed => {
                let (start, count) = field.window(0);
                slice_chars(line, start, count)
            }
            FormatKind::Delimited => {
                let fields = self.split(line);
                let column = fields.get(field.position?.checked_sub(1)?)?;
                let (start, count) = field.window(0);
                slice_chars(column, start, count)
            }
        };
        self.timestamp_from(text)
    }

    /// Decode a complete line: point code (multi-point files only),
    /// timestamp and one observation per variable slot.
    pub fn parse_line(&self, line: &str, line_number: usize, path: &Path) -> Result<ParsedRecord> {
        let point_code = if self.schema.format.is_single_point {
            None
        } else {
            Some(
                self.extract_point_code(line)
                    .ok_or_else(|| ProcessingError::PointCodeNotFound {
                        path: path.to_path_buf(),
                    })?,
            )
        };

        let (timestamp, observations) = self.parse_values(line, line_number, path)?;

        Ok(ParsedRecord {
            point_code,
            timestamp,
            observations,
        })
    }

    /// Timestamp and observations of a line. Fails on a missing timestamp
    /// or, in delimited files, on a column reference beyond the row.
    pub fn parse_values(
        &self,
        line: &str,
        line_number: usize,
        path: &Path,
    ) -> Result<(Timestamp, Vec<Observation>)> {
        let timestamp =
            self.extract_timestamp(line)
                .ok_or_else(|| ProcessingError::InvalidTimestamp {
                    path: path.to_path_buf(),
                    line: line_number,
                })?;

        let observations = match self.kind {
            FormatKind::Fixed => self.fixed_observations(line, timestamp),
            FormatKind::Delimited => self.delimited_observations(line, timestamp, line_number, path)?,
        };

        Ok((timestamp, observations))
    }

    fn fixed_observations(&self, line: &str, timestamp: Timestamp) -> Vec<Observation> {
        let mut observations = Vec::with_capacity(self.schema.num_var_fields);

        for (index, rule) in self.schema.variables.iter().enumerate() {
            for replica in 0..rule.replication_count {
                observations.push(Observation {
                    variable: index,
                    replica,
                    timestamp: timestamp.offset(replica),
                    reading: self.fixed_reading(line, rule, replica),
                });
            }
        }

        observations
    }

    /// Daily rows parse the value before looking at the flag, so a bad
    /// value is counted even when flagged. Hourly rows drop a rejected
    /// flag without parsing the value.
    fn fixed_reading(&self, line: &str, rule: &VariableRule, replica: usize) -> Reading {
        let flag_accepted = self.fixed_flag_accepted(line, rule, replica);
        if !flag_accepted && self.granularity == Granularity::Hourly {
            return Reading::Missing;
        }

        let number = match self.field_value(line, replica, &rule.value_field) {
            Ok(value) => value.as_f32(&self.schema.format.decimal_separator),
            Err(_) => None,
        };
        let Some(number) = number else {
            return Reading::Error;
        };

        if !flag_accepted || self.schema.format.is_missing(number) {
            Reading::Missing
        } else {
            Reading::Value(number)
        }
    }

    fn fixed_flag_accepted(&self, line: &str, rule: &VariableRule, replica: usize) -> bool {
        let (Some(accepted), Some(flag)) = (&rule.accepted_flag, &rule.flag_field) else {
            return true;
        };
        if !flag.format.is_flag_compatible() {
            return true;
        }

        match self.field_value(line, replica, flag) {
            Ok(FieldValue::Text(text)) => text == *accepted,
            Ok(FieldValue::Integer(value)) => match accepted.trim().parse::<i64>() {
                Ok(expected) => value == expected,
                Err(_) => value.to_string() == *accepted,
            },
            _ => false,
        }
    }

    fn delimited_observations(
        &self,
        line: &str,
        timestamp: Timestamp,
        line_number: usize,
        path: &Path,
    ) -> Result<Vec<Observation>> {
        let fields = self.split(line);
        let column = |position| column_at(&fields, position, line_number, path);

        let mut observations = Vec::with_capacity(self.schema.variables.len());

        for (index, rule) in self.schema.variables.iter().enumerate() {
            let value_column = column(rule.value_field.position)?;
            let number = match self.field_value(value_column, 0, &rule.value_field) {
                Ok(value) => value.as_f32(&self.schema.format.decimal_separator),
                Err(_) => None,
            };

            let mut flag_accepted = true;
            if let (Some(accepted), Some(flag)) = (&rule.accepted_flag, &rule.flag_field) {
                if flag.position.is_some() {
                    flag_accepted = column(flag.position)? == accepted.as_str();
                }
            }

            let reading = match number {
                None => Reading::Error,
                Some(n) if !flag_accepted || self.schema.format.is_missing(n) => Reading::Missing,
                Some(n) => Reading::Value(n),
            };

            observations.push(Observation {
                variable: index,
                replica: 0,
                timestamp,
                reading,
            });
        }

        Ok(observations)
    }
}

fn column_at<'l>(
    fields: &[&'l str],
    position: Option<usize>,
    line_number: usize,
    path: &Path,
) -> Result<&'l str> {
    position
        .filter(|p| *p > 0 && *p <= fields.len())
        .map(|p| fields[p - 1])
        .ok_or_else(|| ProcessingError::ColumnOutOfRange {
            path: path.to_path_buf(),
            line: line_number,
            column: position.unwrap_or(0),
            field_count: fields.len(),
        })
}
