pub mod extractor;

pub use extractor::{is_archive, ArchiveExtractor};
