//! Import settings, layered from built-in defaults, an optional TOML file
//! and `METEO_IMPORT_*` environment variables.

use crate::error::Result;
use crate::readers::DataFileReader;
use crate::utils::constants::{
    COMPRESSION_SNAPPY, DEFAULT_ENCODING, DEFAULT_MAX_BATCH_SIZE, DEFAULT_ROW_GROUP_SIZE,
    ENV_PREFIX,
};
use crate::writers::parquet_sink::parse_compression;
use crate::writers::StorageKind;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ImportConfig {
    /// Store receiving the batches
    pub storage: StorageKind,

    /// Text encoding of the data files
    #[validate(length(min = 1, message = "encoding must not be empty"))]
    pub encoding: String,

    /// Read data files through a memory map
    pub use_mmap: bool,

    /// Rows per station batch before an early flush; 0 = unbounded
    pub max_batch_size: usize,

    /// Parquet compression codec
    pub compression: String,

    #[validate(range(min = 1, message = "row group size must be at least 1"))]
    pub row_group_size: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Point,
            encoding: DEFAULT_ENCODING.to_string(),
            use_mmap: false,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            compression: COMPRESSION_SNAPPY.to_string(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }
}

impl ImportConfig {
    /// Defaults, then `file` when given, then the environment.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    pub fn load_with_prefix(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("storage", defaults.storage.to_string())?
            .set_default("encoding", defaults.encoding)?
            .set_default("use_mmap", defaults.use_mmap)?
            .set_default("max_batch_size", defaults.max_batch_size as u64)?
            .set_default("compression", defaults.compression)?
            .set_default("row_group_size", defaults.row_group_size as u64)?;

        if let Some(path) = file {
            debug!("Loading settings from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings = builder
            .add_source(Environment::with_prefix(env_prefix).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Validate field ranges, the compression codec and the encoding label
    pub fn check(&self) -> Result<()> {
        self.validate()?;
        parse_compression(&self.compression)?;
        DataFileReader::with_encoding(&self.encoding)?;
        Ok(())
    }

    pub fn data_reader(&self) -> Result<DataFileReader> {
        Ok(DataFileReader::with_encoding(&self.encoding)?.with_mmap(self.use_mmap))
    }
}
