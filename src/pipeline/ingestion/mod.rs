// Ingestion: CSV source files -> validated intermediate JSON arrays,
// guarded by the content-hash ledger.

pub mod ingestor;
pub mod ledger;
pub mod source;

pub use ingestor::{IngestReport, Ingestor};
pub use ledger::Ledger;
pub use source::{create_source, CsvSource, DataSource, SourceKind, Table};
