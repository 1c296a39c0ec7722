use crate::error::{ProcessingError, Result};
use crate::models::{MeteoVariable, ObservationRow, PointCodeOrigin, Reading, SchemaModel};
use crate::processors::import_report::ImportOutcome;
use crate::readers::{DataFileReader, RecordParser};
use crate::utils::constants::DEFAULT_MAX_BATCH_SIZE;
use crate::writers::{BatchTarget, DataSink, StorageKind};
use std::path::Path;
use tracing::{debug, info, warn};

/// Rows accumulated for the station currently being read
#[derive(Debug, Default)]
struct StationBatch {
    code: Option<String>,
    rows: Vec<ObservationRow>,
}

/// Streams one data file through a schema into a data sink.
///
/// Batches go to the sink at every station change, whenever a batch
/// reaches the size cap, and at end of file. A fatal error leaves the
/// batches already written in place.
pub struct ImportPipeline<'a> {
    schema: &'a SchemaModel,
    storage: StorageKind,
    reader: DataFileReader,
    max_batch_size: usize,
}

impl<'a> ImportPipeline<'a> {
    pub fn new(schema: &'a SchemaModel, storage: StorageKind) -> Self {
        Self {
            schema,
            storage,
            reader: DataFileReader::new(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    pub fn with_reader(mut self, reader: DataFileReader) -> Self {
        self.reader = reader;
        self
    }

    /// Cap on rows per batch; `0` keeps each station in a single batch
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn run(&self, path: &Path, sink: &mut dyn DataSink) -> Result<ImportOutcome> {
        let parser = RecordParser::new(self.schema)?;
        let target = BatchTarget::new(self.storage, parser.granularity());
        let variable_codes = self.resolve_variable_codes(&parser, sink)?;

        info!("Importing {} as {}", path.display(), target);

        let mut outcome = ImportOutcome::new(path.to_path_buf());
        let mut batch = StationBatch::default();

        let single_point = self.schema.format.is_single_point;
        if single_point {
            let code = self.single_point_code(&parser, path, sink)?;
            outcome.stations.push(code.clone());
            batch.code = Some(code);
        }

        let mut line_number = 0;
        for line in self.reader.lines(path)? {
            let line = line?;
            line_number += 1;

            if line_number <= self.schema.format.header_rows || line.is_empty() {
                continue;
            }

            if !single_point {
                let code = parser.extract_point_code(&line).ok_or_else(|| {
                    ProcessingError::PointCodeNotFound {
                        path: path.to_path_buf(),
                    }
                })?;

                if batch.code.as_deref() != Some(code.as_str()) {
                    self.flush(&mut batch, target, sink, &mut outcome)?;
                    self.check_station(sink, &code, path)?;
                    outcome.stations.push(code.clone());
                    batch.code = Some(code);
                }
            }

            let (_, observations) = parser.parse_values(&line, line_number, path)?;
            outcome.data_lines += 1;

            let mut line_errors = 0;
            for observation in observations {
                match observation.reading {
                    Reading::Value(value) => {
                        let variable_code = variable_codes[observation.variable].ok_or_else(|| {
                            ProcessingError::UnknownVariable {
                                name: self.schema.variables[observation.variable].name().to_string(),
                                path: path.to_path_buf(),
                            }
                        })?;
                        batch.rows.push(ObservationRow::new(
                            observation.timestamp,
                            variable_code,
                            value,
                        ));
                    }
                    Reading::Missing => outcome.missing_values += 1,
                    Reading::Error => line_errors += 1,
                }
            }

            if line_errors > 0 {
                warn!(
                    "{}: {} invalid values on line {}",
                    path.display(),
                    line_errors,
                    line_number
                );
                outcome.error_count += line_errors;
                outcome.error_rows += 1;
            }

            if self.max_batch_size > 0 && batch.rows.len() >= self.max_batch_size {
                self.flush(&mut batch, target, sink, &mut outcome)?;
            }
        }

        self.flush(&mut batch, target, sink, &mut outcome)?;

        info!(
            "Imported {}: {} lines, {} observations, {} rows with errors",
            path.display(),
            outcome.data_lines,
            outcome.observations_written,
            outcome.error_rows
        );

        Ok(outcome)
    }

    /// Store identifiers per variable rule; `None` for names that do not
    /// resolve at this granularity.
    fn resolve_variable_codes(
        &self,
        parser: &RecordParser,
        sink: &dyn DataSink,
    ) -> Result<Vec<Option<i32>>> {
        let mut codes = Vec::with_capacity(self.schema.variables.len());

        for rule in &self.schema.variables {
            let code = match MeteoVariable::from_name(rule.name(), parser.granularity()) {
                Some(variable) => sink.variable_code(self.storage, variable)?,
                None => None,
            };
            if code.is_none() {
                debug!("Variable {} has no store identifier", rule.name());
            }
            codes.push(code);
        }

        Ok(codes)
    }

    fn single_point_code(
        &self,
        parser: &RecordParser,
        path: &Path,
        sink: &dyn DataSink,
    ) -> Result<String> {
        if self.schema.point_code.origin != Some(PointCodeOrigin::FilenameDefined) {
            return Err(ProcessingError::NotFilenameDefined {
                path: path.to_path_buf(),
            });
        }

        let base_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .and_then(|f| f.split('.').next())
            .unwrap_or_default();

        let code = parser
            .extract_point_code(base_name)
            .ok_or_else(|| ProcessingError::PointCodeNotFound {
                path: path.to_path_buf(),
            })?;

        self.check_station(sink, &code, path)?;
        Ok(code)
    }

    fn check_station(&self, sink: &dyn DataSink, code: &str, path: &Path) -> Result<()> {
        if sink.exists_station(self.storage, code)? {
            Ok(())
        } else {
            Err(ProcessingError::UnknownStation {
                code: code.to_string(),
                path: path.to_path_buf(),
            })
        }
    }

    fn flush(
        &self,
        batch: &mut StationBatch,
        target: BatchTarget,
        sink: &mut dyn DataSink,
        outcome: &mut ImportOutcome,
    ) -> Result<()> {
        let Some(code) = batch.code.as_deref() else {
            return Ok(());
        };
        if batch.rows.is_empty() {
            return Ok(());
        }

        debug!("Writing {} rows for station {}", batch.rows.len(), code);
        target.write(sink, code, &batch.rows)?;

        outcome.observations_written += batch.rows.len();
        outcome.batches_written += 1;
        batch.rows.clear();
        Ok(())
    }
}
