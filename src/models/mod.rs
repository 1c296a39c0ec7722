pub mod field;
pub mod record;
pub mod schema;
pub mod station;
pub mod variable;

pub use field::{Alignment, FieldDescriptor, FieldFormat};
pub use record::{FieldValue, Observation, ObservationRow, ParsedRecord, Reading, Timestamp};
pub use schema::{
    FilenameRule, FormatKind, FormatSpec, Granularity, PointCodeOrigin, PointCodeRule,
    SchemaModel, TimeRule, VariableRule, VariableRuleBuilder,
};
pub use station::StationMetadata;
pub use variable::MeteoVariable;
