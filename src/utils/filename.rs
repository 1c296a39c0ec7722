use crate::error::{ProcessingError, Result};
use crate::models::SchemaModel;
use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Data filename for a station: path prefix, code and fixed texts,
/// concatenated as written in the schema.
pub fn build_filename(code: &str, schema: &SchemaModel) -> Result<PathBuf> {
    let rule = &schema.filename;

    if let Some(max) = rule.code_length {
        if code.chars().count() > max {
            return Err(ProcessingError::InvalidFormat(format!(
                "Point code '{}' is longer than {} characters",
                code, max
            )));
        }
    }

    Ok(PathBuf::from(format!("{}{}{}", rule.path, code, rule.suffix())))
}

/// Generate default Parquet filename with format: meteo-import-{YYMMDD}.parquet
pub fn generate_default_parquet_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("meteo-import-{:02}{:02}{:02}.parquet", year, month, day);
    PathBuf::from("output").join(filename)
}
