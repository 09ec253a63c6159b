use super::ledger::Ledger;
use super::source::{create_source, DataSource};
use crate::config::Config;
use crate::constants::{FILE_TIMESTAMP_FORMAT, REQUIRED_COLUMNS};
use crate::contracts::InputRecord;
use crate::error::{EtlError, Result};
use crate::hashing::file_sha256;
use crate::metrics::IngestorMetrics;
use crate::storage::{atomic_write, file_name, list_files_with_extension};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Serialize)]
pub struct IngestedFile {
    pub source: String,
    pub artifact: PathBuf,
    pub valid_rows: usize,
    pub rejected_rows: usize,
}

#[derive(Debug, Serialize)]
pub struct FailedFile {
    pub source: String,
    pub reason: String,
}

/// Result of one `ingest()` run
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub files_seen: usize,
    pub files_skipped: usize,
    pub ingested: Vec<IngestedFile>,
    pub failed: Vec<FailedFile>,
    pub ledger_size: usize,
}

/// Reads CSV files from the input directory and emits one validated JSON
/// array per new file, skipping files whose content hash is in the ledger.
pub struct Ingestor {
    input_dir: PathBuf,
    output_dir: PathBuf,
    ledger: Ledger,
    source: Box<dyn DataSource>,
}

impl Ingestor {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_dirs(&config.input_dir, &config.intermediate_dir)
    }

    /// Creates the output directory if needed and loads its ledger.
    pub fn with_dirs(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let input_dir = input_dir.into();
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        let ledger = Ledger::load(&output_dir)?;
        Ok(Self {
            input_dir,
            output_dir,
            ledger,
            source: create_source("csv")?,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Only a failure to list the input directory is returned as an error;
    /// everything per file is logged and recorded in the report.
    #[instrument(skip(self), fields(input_dir = %self.input_dir.display()))]
    pub fn ingest(&mut self) -> Result<IngestReport> {
        let csv_files = list_files_with_extension(&self.input_dir, "csv")?;
        info!("Found {} CSV files", csv_files.len());

        let mut report = IngestReport::default();
        for path in &csv_files {
            report.files_seen += 1;
            let name = file_name(path);

            let hash = match file_sha256(path) {
                Ok(hash) => hash,
                Err(e) => {
                    error!("Failed to hash {}: {}", name, e);
                    IngestorMetrics::record_file_failed();
                    report.failed.push(FailedFile {
                        source: name,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if self.ledger.contains(&hash) {
                info!("File {} already processed (hash: {}...)", name, &hash[..8]);
                IngestorMetrics::record_file_skipped();
                report.files_skipped += 1;
                continue;
            }

            match self.ingest_file(path, hash) {
                Ok(ingested) => {
                    info!(
                        "Processed: {} -> {} ({} valid, {} rejected)",
                        name,
                        file_name(&ingested.artifact),
                        ingested.valid_rows,
                        ingested.rejected_rows
                    );
                    report.ingested.push(ingested);
                }
                Err(e) => {
                    error!("Error processing {}: {}", name, e);
                    IngestorMetrics::record_file_failed();
                    report.failed.push(FailedFile {
                        source: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report.ledger_size = self.ledger.len();
        IngestorMetrics::record_ledger_size(report.ledger_size);
        info!(
            "Ingestion complete. {} ingested, {} skipped, {} failed, {} hashes in ledger",
            report.ingested.len(),
            report.files_skipped,
            report.failed.len(),
            report.ledger_size
        );
        Ok(report)
    }

    fn ingest_file(&mut self, path: &Path, hash: String) -> Result<IngestedFile> {
        let name = file_name(path);
        let table = self.source.read(path)?;

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|required| !table.columns.iter().any(|c| c == *required))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EtlError::MissingColumns(missing));
        }

        for malformed in &table.malformed {
            warn!("Unreadable row in {}: {}", name, malformed);
        }

        let mut records = Vec::with_capacity(table.rows.len());
        let mut rejected = table.malformed.len();
        for (idx, row) in table.rows.iter().enumerate() {
            match InputRecord::from_row(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Invalid record in {} (data row {}): {}", name, idx + 1, e);
                    rejected += 1;
                }
            }
        }

        // Not marked processed: a corrected file is retried on the next run
        if records.is_empty() {
            return Err(EtlError::NoValidRecords(name));
        }

        records.sort_by_key(|r| r.id);

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.clone());
        let artifact = self.output_dir.join(format!(
            "{}_{}.json",
            stem,
            Utc::now().format(FILE_TIMESTAMP_FORMAT)
        ));
        let json = serde_json::to_string_pretty(&records)?;
        atomic_write(&artifact, json.as_bytes())?;

        self.ledger.record(hash)?;
        IngestorMetrics::record_file_ingested(records.len(), rejected);

        Ok(IngestedFile {
            source: name,
            artifact,
            valid_rows: records.len(),
            rejected_rows: rejected,
        })
    }
}
