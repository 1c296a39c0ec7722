use crate::error::{ProcessingError, Result};
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_ENCODING};
use encoding_rs::Encoding;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// Reads data files line by line, decoding each line from the configured
/// text encoding. Lines keep their content but lose the line terminator.
pub struct DataFileReader {
    encoding: &'static Encoding,
    use_mmap: bool,
}

impl DataFileReader {
    pub fn new() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            use_mmap: false,
        }
    }

    /// Reader for an encoding label such as `utf-8`, `latin1` or `windows-1252`.
    /// Only ASCII-compatible encodings can be split on `\n` safely.
    pub fn with_encoding(label: &str) -> Result<Self> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ProcessingError::Config(format!("Unknown encoding: '{}'", label)))?;

        if !encoding.is_ascii_compatible() {
            return Err(ProcessingError::Config(format!(
                "Encoding {} is not supported for line-oriented data files",
                encoding.name()
            )));
        }

        Ok(Self {
            encoding,
            use_mmap: false,
        })
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Open `path` and stream its lines
    pub fn lines(&self, path: &Path) -> Result<DataLines> {
        let file = File::open(path).map_err(|source| ProcessingError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;

        let source = if self.use_mmap {
            let mmap = unsafe { Mmap::map(&file)? };
            LineSource::Mapped { mmap, offset: 0 }
        } else {
            LineSource::Buffered(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file))
        };

        Ok(DataLines {
            source,
            encoding: self.encoding,
            buffer: Vec::new(),
            line_count: 0,
        })
    }

    /// Read every line of `path` into memory
    pub fn read_lines(&self, path: &Path) -> Result<Vec<String>> {
        self.lines(path)?.collect()
    }
}

impl Default for DataFileReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<&str> for DataFileReader {
    type Error = ProcessingError;

    fn try_from(label: &str) -> Result<Self> {
        if label.is_empty() {
            Self::with_encoding(DEFAULT_ENCODING)
        } else {
            Self::with_encoding(label)
        }
    }
}

enum LineSource {
    Buffered(BufReader<File>),
    Mapped { mmap: Mmap, offset: usize },
}

/// Iterator over the decoded lines of one data file
pub struct DataLines {
    source: LineSource,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
    line_count: usize,
}

impl DataLines {
    /// Number of lines read so far, empty lines included
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    fn decode(&self, raw: &[u8]) -> String {
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);

        let (text, had_errors) = self.encoding.decode_without_bom_handling(raw);
        if had_errors {
            warn!(
                "Line {} contains bytes that are not valid {}",
                self.line_count,
                self.encoding.name()
            );
        }
        text.into_owned()
    }
}

impl Iterator for DataLines {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw: Vec<u8> = match &mut self.source {
            LineSource::Buffered(reader) => {
                self.buffer.clear();
                match reader.read_until(b'\n', &mut self.buffer) {
                    Ok(0) => return None, // EOF
                    Ok(_) => std::mem::take(&mut self.buffer),
                    Err(e) => return Some(Err(e.into())),
                }
            }
            LineSource::Mapped { mmap, offset } => {
                let rest = &mmap[*offset..];
                if rest.is_empty() {
                    return None;
                }
                let end = rest
                    .iter()
                    .position(|&b| b == b'\n')
                    .map(|p| p + 1)
                    .unwrap_or(rest.len());
                *offset += end;
                rest[..end].to_vec()
            }
        };

        self.line_count += 1;

        // strip a UTF-8 byte order mark on the first line
        let raw = if self.line_count == 1 {
            raw.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&raw[..]).to_vec()
        } else {
            raw
        };

        Some(Ok(self.decode(&raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_bytes(bytes: &[u8]) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_buffered_lines() -> Result<()> {
        let file = write_bytes(b"header\r\n\r\nS1,2023-01-01,5.5\nlast")?;
        let lines = DataFileReader::new().read_lines(file.path())?;
        assert_eq!(lines, vec!["header", "", "S1,2023-01-01,5.5", "last"]);
        Ok(())
    }

    #[test]
    fn test_mmap_matches_buffered() -> Result<()> {
        let file = write_bytes(b"a\nb\r\n\nc\n")?;
        let buffered = DataFileReader::new().read_lines(file.path())?;
        let mapped = DataFileReader::new().with_mmap(true).read_lines(file.path())?;
        assert_eq!(buffered, mapped);
        assert_eq!(mapped, vec!["a", "b", "", "c"]);
        Ok(())
    }

    #[test]
    fn test_latin1_decoding() -> Result<()> {
        let file = write_bytes(b"Forl\xEC,20230101\n")?;
        let reader = DataFileReader::with_encoding("latin1")?;
        let lines = reader.read_lines(file.path())?;
        assert_eq!(lines, vec!["Forlì,20230101"]);
        Ok(())
    }

    #[test]
    fn test_bom_is_dropped() -> Result<()> {
        let file = write_bytes(b"\xEF\xBB\xBFS1,1\n")?;
        let lines = DataFileReader::new().read_lines(file.path())?;
        assert_eq!(lines, vec!["S1,1"]);
        Ok(())
    }

    #[test]
    fn test_rejected_encodings() {
        assert!(matches!(
            DataFileReader::with_encoding("klingon"),
            Err(ProcessingError::Config(_))
        ));
        assert!(matches!(
            DataFileReader::with_encoding("utf-16le"),
            Err(ProcessingError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = DataFileReader::new()
            .lines(Path::new("/nonexistent/data.txt"))
            .err();
        assert!(matches!(err, Some(ProcessingError::OpenFailed { .. })));
    }
}
