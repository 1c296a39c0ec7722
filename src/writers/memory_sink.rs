use crate::models::{Granularity, MeteoVariable, ObservationRow};
use crate::writers::sink::{BatchTarget, DataSink, SinkError, SinkResult, StorageKind};
use std::collections::{HashMap, HashSet};

/// One batch as received by [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenBatch {
    pub target: BatchTarget,
    pub code: String,
    pub rows: Vec<ObservationRow>,
}

/// In-memory store; keeps every batch it receives. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    stations: HashSet<(StorageKind, String)>,
    variables: HashMap<MeteoVariable, i32>,
    batches: Vec<WrittenBatch>,
    fail_after: Option<usize>,
}

impl MemorySink {
    /// Empty sink resolving every variable to its default identifier
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_station(mut self, storage: StorageKind, code: &str) -> Self {
        self.stations.insert((storage, code.to_string()));
        self
    }

    pub fn with_stations<I, S>(mut self, storage: StorageKind, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for code in codes {
            self.stations.insert((storage, code.as_ref().to_string()));
        }
        self
    }

    /// Override the identifier of one variable
    pub fn with_variable_code(mut self, variable: MeteoVariable, code: i32) -> Self {
        self.variables.insert(variable, code);
        self
    }

    /// Make every write after the first `count` batches fail
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn batches(&self) -> &[WrittenBatch] {
        &self.batches
    }

    /// All rows written for `code`, in arrival order
    pub fn rows_for(&self, code: &str) -> Vec<&ObservationRow> {
        self.batches
            .iter()
            .filter(|b| b.code == code)
            .flat_map(|b| b.rows.iter())
            .collect()
    }

    pub fn total_rows(&self) -> usize {
        self.batches.iter().map(|b| b.rows.len()).sum()
    }

    fn record(&mut self, target: BatchTarget, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        if self.fail_after.is_some_and(|limit| self.batches.len() >= limit) {
            return Err(SinkError(format!("write refused for station {}", code)));
        }
        self.batches.push(WrittenBatch {
            target,
            code: code.to_string(),
            rows: rows.to_vec(),
        });
        Ok(())
    }
}

impl DataSink for MemorySink {
    fn exists_station(&self, storage: StorageKind, code: &str) -> SinkResult<bool> {
        Ok(self.stations.contains(&(storage, code.to_string())))
    }

    fn variable_code(&self, _storage: StorageKind, variable: MeteoVariable) -> SinkResult<Option<i32>> {
        Ok(Some(
            self.variables
                .get(&variable)
                .copied()
                .unwrap_or_else(|| variable.default_id()),
        ))
    }

    fn write_point_daily(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.record(BatchTarget::new(StorageKind::Point, Granularity::Daily), code, rows)
    }

    fn write_point_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.record(BatchTarget::new(StorageKind::Point, Granularity::Hourly), code, rows)
    }

    fn write_grid_daily(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.record(BatchTarget::new(StorageKind::Grid, Granularity::Daily), code, rows)
    }

    fn write_grid_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.record(BatchTarget::new(StorageKind::Grid, Granularity::Hourly), code, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use chrono::NaiveDate;

    #[test]
    fn test_station_lookup_is_per_storage() {
        let sink = MemorySink::new().with_station(StorageKind::Point, "S1");
        assert_eq!(sink.exists_station(StorageKind::Point, "S1"), Ok(true));
        assert_eq!(sink.exists_station(StorageKind::Grid, "S1"), Ok(false));
    }

    #[test]
    fn test_batch_dispatch() {
        let mut sink = MemorySink::new();
        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let rows = vec![ObservationRow::new(Timestamp::Date(date), 104, 1.5)];

        let target = BatchTarget::new(StorageKind::Grid, Granularity::Hourly);
        target.write(&mut sink, "C42", &rows).unwrap();

        assert_eq!(sink.batches().len(), 1);
        assert_eq!(sink.batches()[0].target, target);
        assert_eq!(sink.rows_for("C42").len(), 1);
    }

    #[test]
    fn test_variable_code_override() {
        let sink = MemorySink::new().with_variable_code(MeteoVariable::DailyPrecipitation, 250);
        assert_eq!(
            sink.variable_code(StorageKind::Point, MeteoVariable::DailyPrecipitation),
            Ok(Some(250))
        );
        assert_eq!(
            sink.variable_code(StorageKind::Point, MeteoVariable::DailyAirTemperatureMin),
            Ok(Some(101))
        );
    }

    #[test]
    fn test_failing_sink() {
        let mut sink = MemorySink::new().failing_after(0);
        let err = sink.write_point_daily("S1", &[]).unwrap_err();
        assert!(err.to_string().contains("S1"));
    }
}
