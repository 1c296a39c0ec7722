pub mod data_reader;
pub mod record_parser;
pub mod schema_reader;
pub mod station_reader;

pub use data_reader::{DataFileReader, DataLines};
pub use record_parser::{extract_field_value, FieldError, RecordParser};
pub use schema_reader::SchemaLoader;
pub use station_reader::StationReader;
