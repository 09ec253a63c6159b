use super::steps::{StagedRecord, StepPipeline};
use crate::config::Config;
use crate::constants::TRANSFORMED_PREFIX;
use crate::contracts::{now_iso, validate_records, OutputData, OutputMetadata, TransformedRecord};
use crate::error::{ContractViolation, Result};
use crate::hashing::data_hash;
use crate::metrics::TransformerMetrics;
use crate::storage::{atomic_write, file_name, list_files_with_extension};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, instrument};

/// Result of one `transform()` run
#[derive(Debug, Default, Serialize)]
pub struct TransformReport {
    pub files_read: usize,
    pub files_failed: Vec<String>,
    pub records_emitted: usize,
    pub artifact: Option<PathBuf>,
    pub data_hash: Option<String>,
    /// Set when the consolidated records failed validation and nothing was emitted.
    pub validation_errors: Vec<String>,
}

/// Consolidates every intermediate artifact into one hashed output artifact.
pub struct Transformer {
    input_dir: PathBuf,
    output_dir: PathBuf,
    steps: StepPipeline,
}

impl Transformer {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_dirs(&config.intermediate_dir, &config.output_dir)
    }

    pub fn with_dirs(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self {
            input_dir: input_dir.into(),
            output_dir,
            steps: StepPipeline::standard(),
        })
    }

    pub fn with_steps(mut self, steps: StepPipeline) -> Self {
        self.steps = steps;
        self
    }

    /// Emits at most one `transformed_<epoch>.json`. Per-file, validation and
    /// emission failures are logged and reported, never returned as errors.
    #[instrument(skip(self), fields(input_dir = %self.input_dir.display()))]
    pub fn transform(&self) -> Result<TransformReport> {
        let started = Instant::now();
        let run_epoch = Utc::now().timestamp();

        let files = list_files_with_extension(&self.input_dir, "json")?;
        info!("Found {} files to transform", files.len());

        let mut report = TransformReport::default();
        let mut all_records = Vec::new();
        for path in &files {
            let name = file_name(path);
            match self.transform_file(path) {
                Ok(mut records) => {
                    info!("Transformed: {} ({} records)", name, records.len());
                    report.files_read += 1;
                    all_records.append(&mut records);
                }
                Err(e) => {
                    error!("Error transforming {}: {}", name, e);
                    TransformerMetrics::record_file_failed();
                    report.files_failed.push(name);
                }
            }
        }

        if all_records.is_empty() {
            info!("No records to emit");
            return Ok(report);
        }

        // Stable: equal ids keep file-name order, then position within the file
        all_records.sort_by_key(|r| r.id);

        if let Err(violation) = validate_records(&all_records) {
            error!("Validation failed, no artifact emitted: {}", violation);
            TransformerMetrics::record_validation_failed();
            report.validation_errors = violation.violations;
            return Ok(report);
        }

        match self.emit(all_records, run_epoch, started) {
            Ok((path, hash, count)) => {
                info!("Transformation complete. Hash: {}...", &hash[..16]);
                info!("Artifact written: {}", path.display());
                report.records_emitted = count;
                report.artifact = Some(path);
                report.data_hash = Some(hash);
            }
            Err(e) => error!("Failed to write transformed artifact: {}", e),
        }
        Ok(report)
    }

    /// Runs the step pipeline over one intermediate file, sorted by id.
    fn transform_file(&self, path: &Path) -> Result<Vec<TransformedRecord>> {
        let content = fs::read_to_string(path)?;
        let staged: Vec<StagedRecord> = serde_json::from_str(&content)?;

        let mut records = self
            .steps
            .apply(staged)
            .into_iter()
            .map(StagedRecord::finish)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(ContractViolation::single)?;
        records.sort_by_key(|r| r.id);
        Ok(records)
    }

    fn emit(
        &self,
        records: Vec<TransformedRecord>,
        run_epoch: i64,
        started: Instant,
    ) -> Result<(PathBuf, String, usize)> {
        let hash = data_hash(&records)?;
        let count = records.len();
        let execution_time_seconds = started.elapsed().as_secs_f64();

        let output = OutputData {
            metadata: OutputMetadata {
                total_records: count as u64,
                execution_time_seconds,
                data_hash: hash.clone(),
                generated_at: now_iso(),
            },
            records,
        };

        let path = self
            .output_dir
            .join(format!("{}{}.json", TRANSFORMED_PREFIX, run_epoch));
        let json = serde_json::to_string_pretty(&output)?;
        atomic_write(&path, json.as_bytes())?;

        TransformerMetrics::record_emitted(count, execution_time_seconds);
        Ok((path, hash, count))
    }
}
