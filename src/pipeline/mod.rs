// Data pipeline stages: ingestion, processing, and publishing

pub mod ingestion;
pub mod processing;
pub mod publishing;

pub use ingestion::{IngestReport, Ingestor};
pub use processing::{TransformReport, Transformer};
pub use publishing::{PublishedArtifact, Publisher};
