pub mod import_pipeline;
pub mod import_report;
pub mod import_session;

pub use import_pipeline::ImportPipeline;
pub use import_report::{ImportOutcome, SessionReport};
pub use import_session::ImportSession;
