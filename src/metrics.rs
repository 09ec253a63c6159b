//! Phase metrics for the ETL stages
//!
//! Each stage owns a small struct of recording helpers so metric names stay
//! consistent. The core only talks to the `metrics` facade; installing a
//! recorder/exporter is left to the embedding process.

/// Builds metric names following the convention `etl_{phase}_{name}[_total]`.
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("etl_", $phase, "_", $name)
    };
}

pub struct IngestorMetrics;

impl IngestorMetrics {
    pub fn record_file_ingested(valid_rows: usize, rejected_rows: usize) {
        ::metrics::counter!(phase_metric!(counter, "ingestor", "files_ingested")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "ingestor", "rows_valid"))
            .increment(valid_rows as u64);
        ::metrics::counter!(phase_metric!(counter, "ingestor", "rows_rejected"))
            .increment(rejected_rows as u64);
    }

    pub fn record_file_skipped() {
        ::metrics::counter!(phase_metric!(counter, "ingestor", "files_skipped")).increment(1);
    }

    pub fn record_file_failed() {
        ::metrics::counter!(phase_metric!(counter, "ingestor", "files_failed")).increment(1);
    }

    pub fn record_ledger_size(size: usize) {
        ::metrics::gauge!(phase_metric!(gauge, "ingestor", "ledger_entries")).set(size as f64);
    }
}

pub struct TransformerMetrics;

impl TransformerMetrics {
    pub fn record_file_failed() {
        ::metrics::counter!(phase_metric!(counter, "transformer", "files_failed")).increment(1);
    }

    pub fn record_emitted(records: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "transformer", "artifacts_emitted"))
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "transformer", "records_per_artifact"))
            .record(records as f64);
        ::metrics::histogram!(phase_metric!(histogram, "transformer", "duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_validation_failed() {
        ::metrics::counter!(phase_metric!(counter, "transformer", "validation_failures"))
            .increment(1);
    }
}

pub struct PublisherMetrics;

impl PublisherMetrics {
    pub fn record_published(records: u64) {
        ::metrics::counter!(phase_metric!(counter, "publisher", "published")).increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "publisher", "last_published_records"))
            .set(records as f64);
    }

    pub fn record_failed(reason: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "publisher", "failures"), "reason" => reason)
            .increment(1);
    }
}
