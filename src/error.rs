use std::path::PathBuf;
use thiserror::Error;

use crate::writers::SinkError;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing file: {0}")]
    MissingFile(String),

    #[error("Open failed: {}\n {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse xml failed: {} Row: {line} - Column: {column}\n{message}", path.display())]
    ParseFailed {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },

    #[error("Error in schema: {0}")]
    SchemaIncomplete(String),

    #[error("Invalid value '{value}' for schema tag {tag}")]
    InvalidSchemaValue { tag: String, value: String },

    #[error("Open: {} format is single point but the point code is not filename defined", path.display())]
    NotFilenameDefined { path: PathBuf },

    #[error("Point code not found for file: {}", path.display())]
    PointCodeNotFound { path: PathBuf },

    #[error("Point code: {code} does not exist for file: {}", path.display())]
    UnknownStation { code: String, path: PathBuf },

    #[error("Date not found or not valid for file: {} (line {line})", path.display())]
    InvalidTimestamp { path: PathBuf, line: usize },

    #[error("Unknown time type: {0}")]
    UnknownTimeType(String),

    #[error(
        "Column {column} out of range for file: {} (line {line} has {field_count} fields)",
        path.display()
    )]
    ColumnOutOfRange {
        path: PathBuf,
        line: usize,
        column: usize,
        field_count: usize,
    },

    #[error("Meteo variable {name} not found or not valid for file: {}", path.display())]
    UnknownVariable { name: String, path: PathBuf },

    #[error("Data sink error: {0}")]
    SinkFailure(#[from] SinkError),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
