use crate::archive::{is_archive, ArchiveExtractor};
use crate::config::ImportConfig;
use crate::error::Result;
use crate::models::SchemaModel;
use crate::processors::import_pipeline::ImportPipeline;
use crate::processors::import_report::SessionReport;
use crate::utils::progress::ProgressReporter;
use crate::writers::DataSink;
use std::path::PathBuf;
use tracing::info;

/// Imports a list of data files, or zip archives of data files, one after
/// the other into the same sink. Stops at the first fatal error.
pub struct ImportSession<'a> {
    schema: &'a SchemaModel,
    config: ImportConfig,
    show_progress: bool,
    dry_run: bool,
}

impl<'a> ImportSession<'a> {
    pub fn new(schema: &'a SchemaModel, config: ImportConfig) -> Self {
        Self {
            schema,
            config,
            show_progress: false,
            dry_run: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Only marks the report; the caller picks a non-persisting sink
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    pub fn run(&self, inputs: &[PathBuf], sink: &mut dyn DataSink) -> Result<SessionReport> {
        // keeps extracted files alive until the session ends
        let mut extractor: Option<ArchiveExtractor> = None;
        let files = expand_inputs(inputs, &mut extractor)?;

        let pipeline = ImportPipeline::new(self.schema, self.config.storage)
            .with_reader(self.config.data_reader()?)
            .with_max_batch_size(self.config.max_batch_size);

        let progress = ProgressReporter::new(
            files.len() as u64,
            "Importing data files",
            !self.show_progress,
        );
        let mut report = SessionReport {
            dry_run: self.dry_run,
            ..SessionReport::default()
        };

        for file in &files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            progress.set_message(&format!("Importing {}", name));

            let outcome = pipeline.run(file, sink)?;
            if !outcome.is_clean() {
                progress.println(&format!(
                    "{}: {} rows with invalid values",
                    name, outcome.error_rows
                ));
            }
            report.add(outcome);
            progress.increment(1);
        }

        progress.finish_with_message(&format!("Imported {} files", files.len()));
        info!(
            "Session finished: {} files, {} observations, {} rows with errors",
            report.files.len(),
            report.total_observations(),
            report.total_error_rows()
        );

        Ok(report)
    }
}

/// Replace every archive in `inputs` by the data files it contains
fn expand_inputs(
    inputs: &[PathBuf],
    extractor: &mut Option<ArchiveExtractor>,
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(inputs.len());

    for input in inputs {
        if is_archive(input) {
            let extractor = match extractor {
                Some(e) => e,
                None => extractor.insert(ArchiveExtractor::new()?),
            };
            let extracted = extractor.extract_data_files(input)?;
            info!(
                "{} contains {} data files",
                input.display(),
                extracted.len()
            );
            files.extend(extracted);
        } else {
            files.push(input.clone());
        }
    }

    Ok(files)
}
