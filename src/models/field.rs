use serde::{Deserialize, Serialize};
use std::fmt;

/// How a field's raw text is turned into a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldFormat {
    /// `""` or `"%s"`: the slice is passed through as text
    #[default]
    Text,
    /// `"%d"`
    Integer,
    /// `"%f"` or `"%.<n>f"`
    Float { decimals: Option<usize> },
    /// Anything else, e.g. a date/time pattern such as `yyyyMMdd`
    Pattern(String),
}

impl FieldFormat {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw {
            "" | "%s" => FieldFormat::Text,
            "%d" => FieldFormat::Integer,
            _ if raw.starts_with('%') && raw.ends_with('f') => {
                let decimals = raw
                    .find('.')
                    .and_then(|dot| raw[dot + 1..raw.len() - 1].parse::<usize>().ok());
                FieldFormat::Float { decimals }
            }
            _ => FieldFormat::Pattern(raw.to_string()),
        }
    }

    /// Formats accepted for flag fields in fixed-width rows
    pub fn is_flag_compatible(&self) -> bool {
        matches!(self, FieldFormat::Text | FieldFormat::Integer)
    }

    pub fn pattern(&self) -> &str {
        match self {
            FieldFormat::Pattern(p) => p,
            _ => "",
        }
    }
}

impl fmt::Display for FieldFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFormat::Text => write!(f, "%s"),
            FieldFormat::Integer => write!(f, "%d"),
            FieldFormat::Float { decimals: Some(n) } => write!(f, "%.{}f", n),
            FieldFormat::Float { decimals: None } => write!(f, "%f"),
            FieldFormat::Pattern(p) => write!(f, "{}", p),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LEFT" | "L" => Some(Alignment::Left),
            "RIGHT" | "R" => Some(Alignment::Right),
            "CENTER" | "CENTRE" | "C" => Some(Alignment::Center),
            _ => None,
        }
    }
}

/// Describes where one scalar lives in a data row.
///
/// Fixed-width rows are addressed by `first_char`/`char_count`, delimited
/// rows by `position`. Both are 1-based. A `char_count` of `None` means the
/// field runs to the end of the input it is applied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Raw `TYPE`/`NAME` text: origin, granularity or variable name
    pub kind: String,
    pub format: FieldFormat,
    pub attribute: String,
    pub first_char: usize,
    pub char_count: Option<usize>,
    pub position: Option<usize>,
    pub alignment: Option<Alignment>,
    pub prefix: String,
}

impl Default for FieldDescriptor {
    fn default() -> Self {
        Self {
            kind: String::new(),
            format: FieldFormat::Text,
            attribute: String::new(),
            first_char: 1,
            char_count: None,
            position: None,
            alignment: None,
            prefix: String::new(),
        }
    }
}

impl FieldDescriptor {
    pub fn fixed(first_char: usize, char_count: usize, format: &str) -> Self {
        Self {
            format: FieldFormat::parse(format),
            first_char: first_char.max(1),
            char_count: (char_count > 0).then_some(char_count),
            ..Self::default()
        }
    }

    pub fn delimited(position: usize, format: &str) -> Self {
        Self {
            format: FieldFormat::parse(format),
            position: (position > 0).then_some(position),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    /// Upper-cased, whitespace-collapsed `kind`
    pub fn normalized_kind(&self) -> String {
        self.kind
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase()
    }

    /// Character window of replica `index` in a fixed-width row.
    /// Without a char count the whole input is the field, whatever `first_char` says.
    pub fn window(&self, index: usize) -> (usize, Option<usize>) {
        match self.char_count {
            Some(count) => (self.first_char.saturating_sub(1) + index * count, Some(count)),
            None => (0, None),
        }
    }
}
