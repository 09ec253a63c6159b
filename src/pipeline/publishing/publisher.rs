use crate::config::Config;
use crate::constants::{FILE_TIMESTAMP_FORMAT, METADATA_FILE, PUBLISHED_PREFIX};
use crate::contracts::{now_iso, parse_output_data, PublisherMetadata};
use crate::error::{EtlError, Result};
use crate::metrics::PublisherMetrics;
use crate::storage::{atomic_write, file_name};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{error, info, instrument, warn};

static TRANSFORMED_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^transformed_.*\.json$").expect("transformed artifact pattern is valid")
});

/// What a successful publication left on disk.
#[derive(Debug, Clone)]
pub struct PublishedArtifact {
    pub published_path: PathBuf,
    pub source_file: String,
    pub metadata: PublisherMetadata,
}

/// Most recently modified `transformed_*.json` in `dir`; ties go to the
/// greater file name.
pub fn find_latest_transformed(dir: &Path) -> Result<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, String, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let name = file_name(&path);
        if !TRANSFORMED_NAME.is_match(&name) {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let newer = match &latest {
            Some((t, n, _)) => (modified, name.as_str()) > (*t, n.as_str()),
            None => true,
        };
        if newer {
            latest = Some((modified, name, path));
        }
    }
    Ok(latest.map(|(_, _, path)| path))
}

/// Promotes the newest transformed artifact to a published one.
pub struct Publisher {
    output_dir: PathBuf,
}

impl Publisher {
    pub fn new(config: &Config) -> Self {
        Self::with_dir(&config.output_dir)
    }

    pub fn with_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Boolean wrapper over [`Publisher::try_publish`]; failures are logged.
    pub fn publish(&self) -> bool {
        match self.try_publish() {
            Ok(published) => {
                info!(
                    "Published {} -> {} ({} records)",
                    published.source_file,
                    file_name(&published.published_path),
                    published.metadata.total_records
                );
                PublisherMetrics::record_published(published.metadata.total_records);
                true
            }
            Err(e) => {
                error!("Publishing failed: {}", e);
                PublisherMetrics::record_failed(failure_reason(&e));
                false
            }
        }
    }

    /// Nothing on disk changes until the artifact has passed validation.
    #[instrument(skip(self), fields(output_dir = %self.output_dir.display()))]
    pub fn try_publish(&self) -> Result<PublishedArtifact> {
        let source = find_latest_transformed(&self.output_dir)?
            .ok_or_else(|| EtlError::NoArtifact(self.output_dir.clone()))?;
        let source_file = file_name(&source);
        info!("Publishing {}", source_file);

        let content = fs::read_to_string(&source)?;
        let value: Value = serde_json::from_str(&content)?;
        let data = parse_output_data(value)?;

        let stamp = Utc::now().format(FILE_TIMESTAMP_FORMAT).to_string();
        let published_path = unused_published_path(&self.output_dir, &stamp);
        fs::rename(&source, &published_path)?;

        let metadata = PublisherMetadata {
            published_at: now_iso(),
            source_file: source_file.clone(),
            total_records: data.metadata.total_records,
            data_hash: data.metadata.data_hash,
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        atomic_write(&self.output_dir.join(METADATA_FILE), json.as_bytes())?;

        Ok(PublishedArtifact {
            published_path,
            source_file,
            metadata,
        })
    }
}

/// `published_<stamp>.json`, or `published_<stamp>_<n>.json` when an earlier
/// publication in the same second already holds that name.
fn unused_published_path(dir: &Path, stamp: &str) -> PathBuf {
    let base = dir.join(format!("{}{}.json", PUBLISHED_PREFIX, stamp));
    if !base.exists() {
        return base;
    }
    warn!("{} already exists, adding a suffix", file_name(&base));
    (1u32..)
        .map(|n| dir.join(format!("{}{}_{}.json", PUBLISHED_PREFIX, stamp, n)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(base)
}

fn failure_reason(err: &EtlError) -> &'static str {
    match err {
        EtlError::NoArtifact(_) => "no_artifact",
        EtlError::Json(_) => "malformed",
        EtlError::Contract(_) => "invalid",
        EtlError::AtomicWrite { .. } => "sidecar",
        _ => "io",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::{OutputData, OutputMetadata, TransformedRecord};
    use crate::hashing::data_hash;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::tempdir;

    fn output_data(ids: &[i64]) -> OutputData {
        let records: Vec<TransformedRecord> = ids
            .iter()
            .map(|&id| TransformedRecord {
                id,
                timestamp: "2024-01-15T10:30:00Z".to_string(),
                original_value: id as f64,
                normalized_value: 0.5,
                category: "sensor_a".to_string(),
                processed_at: "2024-01-15T10:31:00.000000Z".to_string(),
            })
            .collect();
        OutputData {
            metadata: OutputMetadata {
                total_records: records.len() as u64,
                execution_time_seconds: 0.01,
                data_hash: data_hash(&records).unwrap(),
                generated_at: "2024-01-15T10:31:00.000000Z".to_string(),
            },
            records,
        }
    }

    fn write_artifact(dir: &Path, name: &str, data: &OutputData) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(data).unwrap()).unwrap();
        path
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| file_name(&e.unwrap().path()))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn publishes_artifact_and_writes_sidecar() {
        let dir = tempdir().unwrap();
        let data = output_data(&[1, 2, 3]);
        write_artifact(dir.path(), "transformed_1700000000.json", &data);

        let published = Publisher::with_dir(dir.path()).try_publish().unwrap();
        assert_eq!(published.source_file, "transformed_1700000000.json");
        assert!(published.published_path.exists());
        assert!(!dir.path().join("transformed_1700000000.json").exists());

        let sidecar: PublisherMetadata = serde_json::from_str(
            &fs::read_to_string(dir.path().join(METADATA_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(sidecar, published.metadata);
        assert_eq!(sidecar.total_records, 3);
        assert_eq!(sidecar.data_hash, data.metadata.data_hash);

        let files = names(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|n| n.starts_with(PUBLISHED_PREFIX)));
        assert!(!files.iter().any(|n| n.ends_with(".tmp")));
    }

    #[test]
    fn same_second_publication_does_not_overwrite() {
        let dir = tempdir().unwrap();
        let stamp = "20240115_103000";
        let first = unused_published_path(dir.path(), stamp);
        assert_eq!(file_name(&first), "published_20240115_103000.json");

        fs::write(&first, "{}").unwrap();
        let second = unused_published_path(dir.path(), stamp);
        assert_eq!(file_name(&second), "published_20240115_103000_1.json");

        fs::write(&second, "{}").unwrap();
        assert_eq!(
            file_name(&unused_published_path(dir.path(), stamp)),
            "published_20240115_103000_2.json"
        );
    }

    #[test]
    fn back_to_back_publications_keep_both_artifacts() {
        let dir = tempdir().unwrap();
        let publisher = Publisher::with_dir(dir.path());

        write_artifact(dir.path(), "transformed_1.json", &output_data(&[1]));
        let first = publisher.try_publish().unwrap();
        write_artifact(dir.path(), "transformed_2.json", &output_data(&[1, 2]));
        let second = publisher.try_publish().unwrap();

        assert_ne!(first.published_path, second.published_path);
        assert!(first.published_path.exists());
        assert!(second.published_path.exists());
    }

    #[test]
    fn empty_directory_publishes_nothing() {
        let dir = tempdir().unwrap();
        let publisher = Publisher::with_dir(dir.path());
        assert!(!publisher.publish());
        assert!(matches!(publisher.try_publish(), Err(EtlError::NoArtifact(_))));
        assert!(names(dir.path()).is_empty());
    }

    #[test]
    fn invalid_artifact_is_left_untouched() {
        let dir = tempdir().unwrap();
        let mut data = output_data(&[1, 2]);
        data.metadata.total_records = 5;
        let path = write_artifact(dir.path(), "transformed_1.json", &data);
        let before = fs::read(&path).unwrap();

        let err = Publisher::with_dir(dir.path()).try_publish().unwrap_err();
        assert!(matches!(err, EtlError::Contract(_)));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(names(dir.path()), vec!["transformed_1.json".to_string()]);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("transformed_1.json"), "{\"records\": [").unwrap();

        assert!(!Publisher::with_dir(dir.path()).publish());
        assert!(dir.path().join("transformed_1.json").exists());
        assert!(!dir.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn latest_artifact_is_chosen_by_modification_time() {
        let dir = tempdir().unwrap();
        let older = write_artifact(dir.path(), "transformed_9.json", &output_data(&[1]));
        let newer = write_artifact(dir.path(), "transformed_1.json", &output_data(&[1, 2]));
        fs::write(dir.path().join("notes.json"), "{}").unwrap();

        let base = SystemTime::now() - Duration::from_secs(60);
        File::options()
            .write(true)
            .open(&older)
            .unwrap()
            .set_modified(base)
            .unwrap();
        File::options()
            .write(true)
            .open(&newer)
            .unwrap()
            .set_modified(base + Duration::from_secs(10))
            .unwrap();

        assert_eq!(find_latest_transformed(dir.path()).unwrap(), Some(newer));
        let published = Publisher::with_dir(dir.path()).try_publish().unwrap();
        assert_eq!(published.source_file, "transformed_1.json");
        assert_eq!(published.metadata.total_records, 2);
    }

    #[test]
    fn equal_modification_times_prefer_greater_name() {
        let dir = tempdir().unwrap();
        let a = write_artifact(dir.path(), "transformed_100.json", &output_data(&[1]));
        let b = write_artifact(dir.path(), "transformed_200.json", &output_data(&[1]));
        let stamp = SystemTime::now() - Duration::from_secs(5);
        for path in [&a, &b] {
            File::options()
                .write(true)
                .open(path)
                .unwrap()
                .set_modified(stamp)
                .unwrap();
        }

        assert_eq!(find_latest_transformed(dir.path()).unwrap(), Some(b));
    }
}
