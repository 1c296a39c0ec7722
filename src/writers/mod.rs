pub mod memory_sink;
pub mod parquet_sink;
pub mod sink;

pub use memory_sink::{MemorySink, WrittenBatch};
pub use parquet_sink::{ParquetFileInfo, ParquetSink};
pub use sink::{BatchTarget, DataSink, SinkError, SinkResult, StorageKind};
