use crate::models::{Granularity, MeteoVariable, ObservationRow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Failure reported by a data sink; the message is surfaced unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// Which store a file is imported into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Point stations
    #[default]
    Point,
    /// Grid cells
    Grid,
}

impl FromStr for StorageKind {
    type Err = SinkError;

    fn from_str(s: &str) -> SinkResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "point" | "station" => Ok(StorageKind::Point),
            "grid" | "cell" => Ok(StorageKind::Grid),
            other => Err(SinkError(format!("Unknown storage kind: {}", other))),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Point => write!(f, "point"),
            StorageKind::Grid => write!(f, "grid"),
        }
    }
}

/// The station/grid store an import writes into.
///
/// Batches for one station arrive in file order; a station may receive
/// several batches during one import.
pub trait DataSink {
    fn exists_station(&self, storage: StorageKind, code: &str) -> SinkResult<bool>;

    /// Store identifier of `variable`, `None` when the store does not know it
    fn variable_code(&self, storage: StorageKind, variable: MeteoVariable) -> SinkResult<Option<i32>>;

    fn write_point_daily(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()>;

    fn write_point_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()>;

    fn write_grid_daily(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()>;

    fn write_grid_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()>;
}

/// Storage kind and granularity pair selecting a sink write entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchTarget {
    pub storage: StorageKind,
    pub granularity: Granularity,
}

impl BatchTarget {
    pub fn new(storage: StorageKind, granularity: Granularity) -> Self {
        Self {
            storage,
            granularity,
        }
    }

    pub fn write<S: DataSink + ?Sized>(
        &self,
        sink: &mut S,
        code: &str,
        rows: &[ObservationRow],
    ) -> SinkResult<()> {
        match (self.storage, self.granularity) {
            (StorageKind::Point, Granularity::Daily) => sink.write_point_daily(code, rows),
            (StorageKind::Point, Granularity::Hourly) => sink.write_point_hourly(code, rows),
            (StorageKind::Grid, Granularity::Daily) => sink.write_grid_daily(code, rows),
            (StorageKind::Grid, Granularity::Hourly) => sink.write_grid_hourly(code, rows),
        }
    }
}

impl fmt::Display for BatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.storage, self.granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kind_parsing() {
        assert_eq!("Grid".parse::<StorageKind>(), Ok(StorageKind::Grid));
        assert_eq!("point".parse::<StorageKind>(), Ok(StorageKind::Point));
        assert!("table".parse::<StorageKind>().is_err());
        assert_eq!(StorageKind::default().to_string(), "point");
    }
}
