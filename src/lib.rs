//! Schema-driven importer for fixed-width and delimited meteorological
//! flat files.
//!
//! An XML schema is loaded once into a [`models::SchemaModel`]; data files
//! are then streamed line by line through a [`readers::RecordParser`] and
//! the decoded observations are handed, one station batch at a time, to a
//! [`writers::DataSink`].

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use config::ImportConfig;
pub use error::{ProcessingError, Result};
pub use processors::{ImportOutcome, ImportPipeline, ImportSession};
pub use readers::{RecordParser, SchemaLoader};
pub use writers::{DataSink, MemorySink, ParquetSink, StorageKind};
