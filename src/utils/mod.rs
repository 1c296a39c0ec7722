pub mod constants;
pub mod date_pattern;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{build_filename, generate_default_parquet_filename};
pub use progress::ProgressReporter;
