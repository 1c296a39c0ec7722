use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::models::field::FieldDescriptor;
use crate::utils::constants::NODATA;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormatKind {
    Fixed,
    Delimited,
}

impl FormatKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FIXED" | "XMLFORMATFIXED" => Some(FormatKind::Fixed),
            "COMMASEPARATED" | "DELIMITED" | "CSV" => Some(FormatKind::Delimited),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    Daily,
    Hourly,
}

impl Granularity {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DAILY" => Some(Granularity::Daily),
            "HOURLY" => Some(Granularity::Hourly),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "daily"),
            Granularity::Hourly => write!(f, "hourly"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointCodeOrigin {
    FieldDefined,
    FilenameDefined,
}

impl PointCodeOrigin {
    pub fn parse(s: &str) -> Option<Self> {
        // FIELDEFINED is a misspelling found in deployed schemas
        match s.to_uppercase().as_str() {
            "FIELDDEFINED" | "FIELDEFINED" | "FIELD_DEFINED" => Some(PointCodeOrigin::FieldDefined),
            "FILENAMEDEFINED" | "FILENAME_DEFINED" => Some(PointCodeOrigin::FilenameDefined),
            _ => None,
        }
    }
}

/// How data filenames are built from station codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilenameRule {
    pub path: String,
    pub point_code_field: String,
    pub fixed_text: Vec<String>,
    pub code_length: Option<usize>,
}

impl FilenameRule {
    pub fn suffix(&self) -> String {
        self.fixed_text.concat()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatSpec {
    /// `None` when `FORMAT.TYPE` is absent or unrecognized
    pub kind: Option<FormatKind>,
    pub is_single_point: bool,
    pub header_rows: usize,
    pub missing_value: f32,
    pub delimiter: String,
    pub decimal_separator: String,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            kind: None,
            is_single_point: false,
            header_rows: 0,
            missing_value: NODATA,
            delimiter: ",".to_string(),
            decimal_separator: ".".to_string(),
        }
    }
}

impl FormatSpec {
    pub fn kind(&self) -> Result<FormatKind> {
        self.kind.ok_or_else(|| {
            ProcessingError::SchemaIncomplete("missing or unknown FORMAT.TYPE".to_string())
        })
    }

    /// True for the configured missing value and the NODATA sentinel
    pub fn is_missing(&self, value: f32) -> bool {
        value == self.missing_value || value == NODATA
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCodeRule {
    pub origin: Option<PointCodeOrigin>,
    pub field: FieldDescriptor,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRule {
    pub granularity: Option<Granularity>,
    pub field: FieldDescriptor,
}

impl TimeRule {
    pub fn granularity(&self) -> Result<Granularity> {
        self.granularity
            .ok_or_else(|| ProcessingError::UnknownTimeType(self.field.normalized_kind()))
    }

    pub fn pattern(&self) -> &str {
        self.field.format.pattern()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VariableRule {
    pub value_field: FieldDescriptor,
    pub flag_field: Option<FieldDescriptor>,
    pub accepted_flag: Option<String>,
    #[validate(range(min = 1, message = "replication count must be at least 1"))]
    pub replication_count: usize,
}

impl VariableRule {
    pub fn builder() -> VariableRuleBuilder {
        VariableRuleBuilder::new()
    }

    pub fn name(&self) -> &str {
        self.value_field.kind.trim()
    }

    pub fn is_replicated(&self) -> bool {
        self.replication_count > 1
    }
}

#[derive(Debug, Default)]
pub struct VariableRuleBuilder {
    value_field: Option<FieldDescriptor>,
    flag_field: Option<FieldDescriptor>,
    accepted_flag: Option<String>,
    replication_count: Option<usize>,
}

impl VariableRuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_field(mut self, field: FieldDescriptor) -> Self {
        self.value_field = Some(field);
        self
    }

    pub fn flag_field(mut self, field: FieldDescriptor) -> Self {
        self.flag_field = Some(field);
        self
    }

    pub fn accepted_flag(mut self, accepted: &str) -> Self {
        self.accepted_flag = Some(accepted.to_string());
        self
    }

    pub fn replication_count(mut self, count: usize) -> Self {
        self.replication_count = Some(count);
        self
    }

    pub fn build(self) -> VariableRule {
        VariableRule {
            value_field: self.value_field.unwrap_or_default(),
            flag_field: self.flag_field,
            // an empty accepted literal means every flag is accepted
            accepted_flag: self.accepted_flag.filter(|a| !a.is_empty()),
            replication_count: self.replication_count.unwrap_or(1).max(1),
        }
    }
}

/// A fully loaded import schema; read-only for the lifetime of an import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SchemaModel {
    pub filename: FilenameRule,
    pub format: FormatSpec,
    pub point_code: PointCodeRule,
    pub time: TimeRule,
    pub variable_code: FieldDescriptor,
    #[validate(length(min = 1, message = "missing variables definition"))]
    pub variables: Vec<VariableRule>,
    pub num_var_fields: usize,
}

impl SchemaModel {
    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn has_replication(&self) -> bool {
        self.variables.iter().any(VariableRule::is_replicated)
    }

    /// Checks the invariants an import relies on before any row is read.
    pub fn check_importable(&self) -> Result<(FormatKind, Granularity)> {
        self.validate()?;
        for rule in &self.variables {
            rule.validate()?;
        }

        let kind = self.format.kind()?;
        let granularity = self.time.granularity()?;

        if self.has_replication() {
            if kind == FormatKind::Delimited {
                return Err(ProcessingError::NotImplemented(
                    "variable replication in delimited files".to_string(),
                ));
            }
            if let Some(rule) = self
                .variables
                .iter()
                .find(|r| r.is_replicated() && r.value_field.char_count.is_none())
            {
                return Err(ProcessingError::SchemaIncomplete(format!(
                    "replicated variable {} needs a character count",
                    rule.name()
                )));
            }
        }

        Ok((kind, granularity))
    }

    pub fn summary(&self) -> String {
        let kind = match self.format.kind {
            Some(FormatKind::Fixed) => "fixed",
            Some(FormatKind::Delimited) => "delimited",
            None => "undefined",
        };
        let granularity = self
            .time
            .granularity
            .map(|g| g.to_string())
            .unwrap_or_else(|| "undefined".to_string());

        format!(
            "Import Schema Summary:\n\
            - Format: {} ({} header rows, missing value {})\n\
            - Single point: {}\n\
            - Time: {} ({})\n\
            - Variables: {}\n\
            - Variable fields: {}",
            kind,
            self.format.header_rows,
            self.format.missing_value,
            self.format.is_single_point,
            granularity,
            self.time.field.format,
            self.variable_names().join(", "),
            self.num_var_fields
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_with(kind: FormatKind, replication: usize) -> SchemaModel {
        let value = FieldDescriptor::fixed(10, 5, "%.1f").with_kind("TAVG");
        SchemaModel {
            format: FormatSpec {
                kind: Some(kind),
                ..FormatSpec::default()
            },
            time: TimeRule {
                granularity: Some(Granularity::Hourly),
                field: FieldDescriptor::fixed(1, 8, "yyyyMMdd"),
            },
            variables: vec![VariableRule::builder()
                .value_field(value)
                .replication_count(replication)
                .build()],
            num_var_fields: replication,
            ..SchemaModel::default()
        }
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!(FormatKind::parse("xmlformatfixed"), Some(FormatKind::Fixed));
        assert_eq!(FormatKind::parse("CSV"), Some(FormatKind::Delimited));
        assert_eq!(FormatKind::parse("binary"), None);
        assert_eq!(
            PointCodeOrigin::parse("fieldefined"),
            Some(PointCodeOrigin::FieldDefined)
        );
        assert_eq!(Granularity::parse("Hourly"), Some(Granularity::Hourly));
    }

    #[test]
    fn test_builder_drops_empty_accepted_flag() {
        let rule = VariableRule::builder().accepted_flag("").build();
        assert_eq!(rule.accepted_flag, None);
        assert_eq!(rule.replication_count, 1);
    }

    #[test]
    fn test_check_importable() {
        assert!(schema_with(FormatKind::Fixed, 24).check_importable().is_ok());

        let err = schema_with(FormatKind::Delimited, 24)
            .check_importable()
            .unwrap_err();
        assert!(matches!(err, ProcessingError::NotImplemented(_)));

        let mut empty = schema_with(FormatKind::Fixed, 1);
        empty.variables.clear();
        assert!(empty.check_importable().is_err());
    }
}
