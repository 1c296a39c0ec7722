/// Missing-data sentinel shared by the station stores
pub const NODATA: f32 = -9999.0;

/// Year returned for dates that could not be found in a row
pub const INVALID_YEAR: i32 = 1800;

/// Configuration
pub const ENV_PREFIX: &str = "METEO_IMPORT";
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Processing defaults
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const DEFAULT_BUFFER_SIZE: usize = 8192 * 16; // 128KB

/// Archive entries that are never data files
pub const ARCHIVE_SKIP_SUFFIXES: &[&str] = &[".xml", ".md", ".pdf"];

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
