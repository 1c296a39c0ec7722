use serde::Serialize;
use std::path::PathBuf;

/// Result of importing one data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub path: PathBuf,
    /// Data lines decoded, header and empty lines excluded
    pub data_lines: usize,
    pub observations_written: usize,
    /// Values dropped by flag rejection or a missing-value sentinel
    pub missing_values: usize,
    /// Values that could not be decoded
    pub error_count: usize,
    /// Lines with at least one undecodable value
    pub error_rows: usize,
    pub batches_written: usize,
    /// Station codes in the order they appeared
    pub stations: Vec<String>,
}

impl ImportOutcome {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.error_rows == 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Import Summary for {}:\n\
            - Data lines: {}\n\
            - Stations: {}\n\
            - Observations written: {} ({} batches)\n\
            - Missing values: {}\n\
            - Rows with errors: {} ({} values)",
            self.path.display(),
            self.data_lines,
            self.stations.len(),
            self.observations_written,
            self.batches_written,
            self.missing_values,
            self.error_rows,
            self.error_count
        )
    }
}

/// Totals across the files of one import session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    pub files: Vec<ImportOutcome>,
    pub dry_run: bool,
}

impl SessionReport {
    pub fn add(&mut self, outcome: ImportOutcome) {
        self.files.push(outcome);
    }

    pub fn total_observations(&self) -> usize {
        self.files.iter().map(|f| f.observations_written).sum()
    }

    pub fn total_error_rows(&self) -> usize {
        self.files.iter().map(|f| f.error_rows).sum()
    }

    pub fn files_with_errors(&self) -> impl Iterator<Item = &ImportOutcome> {
        self.files.iter().filter(|f| !f.is_clean())
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("=== IMPORT SESSION REPORT ===\n");
        if self.dry_run {
            summary.push_str("(dry run: nothing was persisted)\n");
        }
        summary.push_str(&format!("Files imported: {}\n", self.files.len()));
        summary.push_str(&format!(
            "Observations written: {}\n",
            self.total_observations()
        ));
        summary.push_str(&format!(
            "Missing values: {}\n",
            self.files.iter().map(|f| f.missing_values).sum::<usize>()
        ));
        summary.push_str(&format!("Rows with errors: {}\n", self.total_error_rows()));

        let dirty: Vec<&ImportOutcome> = self.files_with_errors().collect();
        if !dirty.is_empty() {
            summary.push_str("\nFiles with errors:\n");
            for outcome in dirty.iter().take(10) {
                summary.push_str(&format!(
                    "  {}: {} rows\n",
                    outcome.path.display(),
                    outcome.error_rows
                ));
            }
            if dirty.len() > 10 {
                summary.push_str(&format!("  ... and {} more\n", dirty.len() - 10));
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, written: usize, error_rows: usize) -> ImportOutcome {
        ImportOutcome {
            observations_written: written,
            error_rows,
            error_count: error_rows,
            ..ImportOutcome::new(PathBuf::from(name))
        }
    }

    #[test]
    fn test_session_totals() {
        let mut report = SessionReport::default();
        report.add(outcome("a.txt", 10, 0));
        report.add(outcome("b.txt", 5, 2));

        assert_eq!(report.total_observations(), 15);
        assert_eq!(report.total_error_rows(), 2);
        assert_eq!(report.files_with_errors().count(), 1);

        let summary = report.generate_summary();
        assert!(summary.contains("Files imported: 2"));
        assert!(summary.contains("b.txt: 2 rows"));
        assert!(!summary.contains("a.txt:"));
    }

    #[test]
    fn test_outcome_summary() {
        let summary = outcome("data.txt", 3, 1).summary();
        assert!(summary.contains("Observations written: 3"));
        assert!(summary.contains("Rows with errors: 1"));
    }
}
