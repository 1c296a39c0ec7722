use crate::error::{ProcessingError, Result};
use crate::models::{Granularity, MeteoVariable, ObservationRow, StationMetadata};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_ROW_GROUP_SIZE,
};
use crate::writers::sink::{DataSink, SinkError, SinkResult, StorageKind};
use arrow::array::{
    ArrayRef, Float32Array, Int32Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Row as stored in the output file
#[derive(Debug, Clone, PartialEq)]
struct StoredRow {
    station_code: String,
    storage: StorageKind,
    granularity: Granularity,
    timestamp_micros: i64,
    variable_code: i32,
    value: f32,
}

/// Sink writing every received batch to a single Parquet file.
///
/// Stations are checked against registries loaded up front, one per
/// storage kind. The file is opened on the first batch and every batch
/// goes straight to the writer, so only the open row group stays in
/// memory. [`ParquetSink::finish`] closes the file and must also be called
/// after a failed import to keep the batches already written.
pub struct ParquetSink {
    output: PathBuf,
    compression: Compression,
    row_group_size: usize,
    registries: HashMap<StorageKind, HashSet<String>>,
    variables: HashMap<MeteoVariable, i32>,
    writer: Option<ArrowWriter<File>>,
    rows_written: usize,
}

impl ParquetSink {
    pub fn new(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            registries: HashMap::new(),
            variables: HashMap::new(),
            writer: None,
            rows_written: 0,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = parse_compression(compression)?;
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Register the stations (or grid cells) known for `storage`
    pub fn with_stations(mut self, storage: StorageKind, stations: &[StationMetadata]) -> Self {
        self.registries
            .entry(storage)
            .or_default()
            .extend(stations.iter().map(|s| s.code.clone()));
        self
    }

    /// Override the identifier of one variable; others use their defaults
    pub fn with_variable_code(mut self, variable: MeteoVariable, code: i32) -> Self {
        self.variables.insert(variable, code);
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Rows handed to the Parquet writer so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    fn open_writer(&self) -> Result<ArrowWriter<File>> {
        let file = File::create(&self.output)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        debug!("Opened {}", self.output.display());
        Ok(ArrowWriter::try_new(file, Self::create_schema(), Some(props))?)
    }

    fn append(
        &mut self,
        storage: StorageKind,
        granularity: Granularity,
        code: &str,
        rows: &[ObservationRow],
    ) -> SinkResult<()> {
        if !self
            .registries
            .get(&storage)
            .is_some_and(|registry| registry.contains(code))
        {
            return Err(SinkError(format!(
                "station {} is not registered for {} storage",
                code, storage
            )));
        }

        let stored: Vec<StoredRow> = rows
            .iter()
            .map(|row| StoredRow {
                station_code: code.to_string(),
                storage,
                granularity,
                timestamp_micros: row.timestamp.to_datetime().and_utc().timestamp_micros(),
                variable_code: row.variable_code,
                value: row.value,
            })
            .collect();

        self.write_rows(&stored)
            .map_err(|e| SinkError(format!("writing station {}: {}", code, e)))?;

        debug!(
            "Wrote {} {} rows for {} station {}",
            rows.len(),
            granularity,
            storage,
            code
        );
        Ok(())
    }

    fn write_rows(&mut self, rows: &[StoredRow]) -> Result<()> {
        let batch = Self::rows_to_batch(rows, Self::create_schema())?;

        if self.writer.is_none() {
            self.writer = Some(self.open_writer()?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(&batch)?;
        }

        self.rows_written += rows.len();
        Ok(())
    }

    fn create_schema() -> Arc<Schema> {
        let fields = vec![
            Field::new("station_code", DataType::Utf8, false),
            Field::new("storage", DataType::Utf8, false),
            Field::new("granularity", DataType::Utf8, false),
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
                false,
            ),
            Field::new("variable_code", DataType::Int32, false),
            Field::new("value", DataType::Float32, false),
        ];

        Arc::new(Schema::new(fields))
    }

    fn rows_to_batch(rows: &[StoredRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let codes: Vec<&str> = rows.iter().map(|r| r.station_code.as_str()).collect();
        let storages: Vec<String> = rows.iter().map(|r| r.storage.to_string()).collect();
        let granularities: Vec<String> = rows.iter().map(|r| r.granularity.to_string()).collect();
        let timestamps: Vec<i64> = rows.iter().map(|r| r.timestamp_micros).collect();
        let variable_codes: Vec<i32> = rows.iter().map(|r| r.variable_code).collect();
        let values: Vec<f32> = rows.iter().map(|r| r.value).collect();

        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(codes)),
            Arc::new(StringArray::from(storages)),
            Arc::new(StringArray::from(granularities)),
            Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
            Arc::new(Int32Array::from(variable_codes)),
            Arc::new(Float32Array::from(values)),
        ];

        let batch = RecordBatch::try_new(schema, columns)?;

        Ok(batch)
    }

    /// Close the file and report on it. A sink that never received a
    /// batch still produces an empty file.
    pub fn finish(self) -> Result<ParquetFileInfo> {
        let writer = match self.writer {
            Some(writer) => writer,
            None => self.open_writer()?,
        };
        writer.close()?;
        info!("Wrote {} rows to {}", self.rows_written, self.output.display());

        get_file_info(&self.output, self.compression)
    }
}

impl DataSink for ParquetSink {
    fn exists_station(&self, storage: StorageKind, code: &str) -> SinkResult<bool> {
        Ok(self
            .registries
            .get(&storage)
            .is_some_and(|registry| registry.contains(code)))
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
        self.append(StorageKind::Point, Granularity::Daily, code, rows)
    }

    fn write_point_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.append(StorageKind::Point, Granularity::Hourly, code, rows)
    }

    fn write_grid_daily(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.append(StorageKind::Grid, Granularity::Daily, code, rows)
    }

    fn write_grid_hourly(&mut self, code: &str, rows: &[ObservationRow]) -> SinkResult<()> {
        self.append(StorageKind::Grid, Granularity::Hourly, code, rows)
    }
}

pub fn parse_compression(compression: &str) -> Result<Compression> {
    let compression = match compression.to_lowercase().as_str() {
        COMPRESSION_SNAPPY => Compression::SNAPPY,
        COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
        COMPRESSION_LZ4 => Compression::LZ4,
        COMPRESSION_ZSTD => Compression::ZSTD(ZstdLevel::default()),
        COMPRESSION_NONE => Compression::UNCOMPRESSED,
        _ => {
            return Err(ProcessingError::Config(format!(
                "Unsupported compression: {}",
                compression
            )))
        }
    };
    Ok(compression)
}

/// Get file statistics
pub fn get_file_info(path: &Path, compression: Compression) -> Result<ParquetFileInfo> {
    use parquet::file::reader::{FileReader, SerializedFileReader};

    let file = File::open(path)?;
    let reader = SerializedFileReader::new(file)?;
    let metadata = reader.metadata();

    let row_groups = metadata.num_row_groups();
    let total_rows = metadata.file_metadata().num_rows();
    let file_size = std::fs::metadata(path)?.len();

    let row_group_sizes = (0..row_groups)
        .map(|i| metadata.row_group(i).num_rows())
        .collect();

    Ok(ParquetFileInfo {
        total_rows,
        row_groups: row_groups as i32,
        row_group_sizes,
        file_size,
        compression,
    })
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let avg_rows = if self.row_groups > 0 {
            self.total_rows as f64 / self.row_groups as f64
        } else {
            0.0
        };
        format!(
            "Parquet File Summary:\n\
            - Total rows: {}\n\
            - Row groups: {}\n\
            - File size: {:.2} MB\n\
            - Compression: {:?}\n\
            - Avg rows per group: {:.0}",
            self.total_rows,
            self.row_groups,
            self.file_size as f64 / 1_048_576.0,
            self.compression,
            avg_rows
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn station(code: &str) -> StationMetadata {
        StationMetadata::new(code.to_string(), String::new(), 44.5, 11.3, None)
    }

    fn rows(count: usize) -> Vec<ObservationRow> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        (0..count)
            .map(|i| ObservationRow::new(Timestamp::Date(start).offset(i), 104, i as f32 * 0.5))
            .collect()
    }

    #[test]
    fn test_write_empty_file() -> Result<()> {
        let dir = TempDir::new()?;
        let sink = ParquetSink::new(&dir.path().join("empty.parquet"));

        let info = sink.finish()?;
        assert_eq!(info.total_rows, 0);
        Ok(())
    }

    #[test]
    fn test_unregistered_station_is_refused() -> Result<()> {
        let dir = TempDir::new()?;
        let mut sink = ParquetSink::new(&dir.path().join("out.parquet"))
            .with_stations(StorageKind::Point, &[station("S1")]);

        assert_eq!(sink.exists_station(StorageKind::Point, "S1"), Ok(true));
        assert_eq!(sink.exists_station(StorageKind::Grid, "S1"), Ok(false));
        assert!(sink.write_grid_daily("S1", &rows(1)).is_err());
        assert!(sink.write_point_daily("S2", &rows(1)).is_err());
        Ok(())
    }

    #[test]
    fn test_rows_written_with_row_groups() -> Result<()> {
        let dir = TempDir::new()?;
        let mut sink = ParquetSink::new(&dir.path().join("out.parquet"))
            .with_row_group_size(4)
            .with_stations(StorageKind::Point, &[station("S1"), station("S2")]);

        sink.write_point_daily("S1", &rows(6))?;
        sink.write_point_daily("S2", &rows(3))?;
        assert_eq!(sink.rows_written(), 9);

        let info = sink.finish()?;
        assert_eq!(info.total_rows, 9);
        assert_eq!(info.row_groups, 3);
        assert!(info.summary().contains("Total rows: 9"));
        Ok(())
    }

    #[test]
    fn test_file_opened_on_first_batch() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.parquet");
        let mut sink = ParquetSink::new(&path).with_stations(StorageKind::Point, &[station("S1")]);

        assert!(!path.exists());
        sink.write_point_daily("S1", &rows(2))?;
        assert!(path.exists());

        let info = sink.finish()?;
        assert_eq!(info.total_rows, 2);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        let dir = TempDir::new()?;

        for compression in ["snappy", "gzip", "lz4", "zstd", "none"] {
            let path = dir.path().join(format!("{}.parquet", compression));
            let mut sink = ParquetSink::new(&path)
                .with_compression(compression)?
                .with_stations(StorageKind::Grid, &[station("C1")]);
            sink.write_grid_hourly("C1", &rows(2))?;

            let result = sink.finish();
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(parse_compression("brotli9000").is_err());
        Ok(())
    }
}
