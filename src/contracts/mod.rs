// Data contracts shared by the pipeline stages: record shapes, the output
// artifact and its JSON schema, and timestamp acceptance rules.

pub mod records;
pub mod schema;
pub mod timestamp;

pub use records::{
    validate_records, InputRecord, OutputData, OutputMetadata, PublisherMetadata,
    TransformedRecord,
};
pub use schema::parse_output_data;
pub use timestamp::{is_iso8601, now_iso};
