/// File and layout constants shared by every pipeline stage.
/// Stages only meet through the filesystem, so these names are the protocol.

// Idempotency ledger kept next to intermediate artifacts
pub const LEDGER_FILE: &str = ".processed_hashes.json";

// Verifier snapshot of intermediate artifact hashes
pub const REFERENCE_FILE: &str = ".reference_hashes.json";

// Publisher sidecar
pub const METADATA_FILE: &str = "metadata.json";

pub const TRANSFORMED_PREFIX: &str = "transformed_";
pub const PUBLISHED_PREFIX: &str = "published_";

/// Columns every input CSV header must contain (any order).
pub const REQUIRED_COLUMNS: [&str; 4] = ["id", "timestamp", "value", "category"];

/// Chunk size used when streaming file contents into SHA-256.
pub const HASH_CHUNK_SIZE: usize = 4096;

// Clean-step fill values
pub const DEFAULT_VALUE: f64 = 0.0;
pub const DEFAULT_CATEGORY: &str = "unknown";
pub const EPOCH_ZERO_TIMESTAMP: &str = "1970-01-01T00:00:00";

/// Normalized value assigned to every record when a batch has no value spread.
pub const DEGENERATE_NORMALIZED_VALUE: f64 = 0.5;

/// strftime pattern for intermediate and published artifact names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const DEFAULT_INPUT_DIR: &str = "data/input";
pub const DEFAULT_INTERMEDIATE_DIR: &str = "data/intermediate";
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
