use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported source type: {0}")]
    UnsupportedSource(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("No valid records in {0}")]
    NoValidRecords(String),

    #[error("No transformed artifacts found in {}", .0.display())]
    NoArtifact(PathBuf),

    #[error("Contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error("Atomic write to {} failed: {source}", .path.display())]
    AtomicWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// A single rejected CSV row. Non-fatal: the row is dropped and logged.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{field}: {reason}")]
pub struct RowError {
    pub field: String,
    pub reason: String,
}

impl RowError {
    pub fn new(field: &str, reason: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Violations collected while checking an artifact against the output contract.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", .violations.join("; "))]
pub struct ContractViolation {
    pub violations: Vec<String>,
}

impl ContractViolation {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            violations: vec![message.into()],
        }
    }
}
