use crate::error::Result;
use crate::utils::constants::ARCHIVE_SKIP_SUFFIXES;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

/// True when `path` looks like a zip archive of data files
pub fn is_archive(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"))
}

/// Unpacks data files from zip archives into a private temporary
/// directory, removed when the extractor is dropped.
pub struct ArchiveExtractor {
    temp_dir: TempDir,
    extracted_files: Vec<PathBuf>,
}

impl ArchiveExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            extracted_files: Vec::new(),
        })
    }

    pub fn temp_dir_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn extracted_files(&self) -> &[PathBuf] {
        &self.extracted_files
    }

    /// Extract every data entry of `zip_path`, in archive order. Directories,
    /// documentation and schema files are skipped.
    pub fn extract_data_files(&mut self, zip_path: &Path) -> Result<Vec<PathBuf>> {
        let file = File::open(zip_path)?;
        let mut archive = ZipArchive::new(file)?;
        let archive_dir = self.archive_dir(zip_path)?;
        let mut extracted_paths = Vec::new();

        for i in 0..archive.len() {
            let mut zip_file = archive.by_index(i)?;
            if zip_file.is_dir() {
                continue;
            }

            let Some(relative) = zip_file.enclosed_name().map(Path::to_path_buf) else {
                warn!(
                    "Skipping unsafe entry '{}' in {}",
                    zip_file.name(),
                    zip_path.display()
                );
                continue;
            };

            if is_skipped(&relative) {
                debug!("Skipping non-data entry {}", relative.display());
                continue;
            }

            let dest_path = archive_dir.join(&relative);
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let mut dest_file = File::create(&dest_path)?;
            let mut writer = BufWriter::new(&mut dest_file);
            std::io::copy(&mut zip_file, &mut writer)?;
            writer.flush()?;

            self.extracted_files.push(dest_path.clone());
            extracted_paths.push(dest_path);
        }

        debug!(
            "Extracted {} data files from {}",
            extracted_paths.len(),
            zip_path.display()
        );
        Ok(extracted_paths)
    }

    /// One subdirectory per archive so equal entry names cannot collide
    fn archive_dir(&self, zip_path: &Path) -> Result<PathBuf> {
        let stem = zip_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("archive");
        let dir = self
            .temp_dir
            .path()
            .join(format!("{:03}_{}", self.extracted_files.len(), stem));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

fn is_skipped(path: &Path) -> bool {
    let name = path.to_string_lossy().to_lowercase();
    ARCHIVE_SKIP_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use zip::{CompressionMethod, ZipWriter};

    fn create_test_zip() -> Result<NamedTempFile> {
        let file = NamedTempFile::new()?;
        {
            let mut zip = ZipWriter::new(&file);
            let options =
                zip::write::FileOptions::default().compression_method(CompressionMethod::Stored);

            zip.start_file("schema.xml", options)?;
            zip.write_all(b"<schema/>")?;

            zip.start_file("daily/S1.txt", options)?;
            zip.write_all(b"code,date,value\nS1,2023-01-01,5.5\n")?;

            zip.start_file("S2.txt", options)?;
            zip.write_all(b"code,date,value\nS2,2023-01-01,6.5\n")?;

            zip.start_file("README.md", options)?;
            zip.write_all(b"# data\n")?;

            zip.finish()?;
        }
        Ok(file)
    }

    #[test]
    fn test_is_archive() {
        assert!(is_archive(Path::new("data/2023.ZIP")));
        assert!(!is_archive(Path::new("data/2023.txt")));
        assert!(!is_archive(Path::new("zip")));
    }

    #[test]
    fn test_extract_data_files() -> Result<()> {
        let test_zip = create_test_zip()?;
        let mut extractor = ArchiveExtractor::new()?;

        let files = extractor.extract_data_files(test_zip.path())?;

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("daily/S1.txt"));
        assert!(files[1].ends_with("S2.txt"));
        assert!(files.iter().all(|f| f.starts_with(extractor.temp_dir_path())));

        let content = std::fs::read_to_string(&files[1])?;
        assert!(content.contains("S2,2023-01-01"));
        Ok(())
    }

    #[test]
    fn test_repeated_extraction_does_not_collide() -> Result<()> {
        let test_zip = create_test_zip()?;
        let mut extractor = ArchiveExtractor::new()?;

        let first = extractor.extract_data_files(test_zip.path())?;
        let second = extractor.extract_data_files(test_zip.path())?;

        assert_ne!(first[0], second[0]);
        assert_eq!(extractor.extracted_files().len(), 4);
        Ok(())
    }

    #[test]
    fn test_temp_dir_removed_on_drop() -> Result<()> {
        let extractor = ArchiveExtractor::new()?;
        let dir = extractor.temp_dir_path().to_path_buf();
        assert!(dir.exists());
        drop(extractor);
        assert!(!dir.exists());
        Ok(())
    }
}
