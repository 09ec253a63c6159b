use crate::constants::{
    DEFAULT_CATEGORY, DEFAULT_VALUE, DEGENERATE_NORMALIZED_VALUE, EPOCH_ZERO_TIMESTAMP,
};
use crate::contracts::{now_iso, TransformedRecord};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// A record moving through the steps. Read leniently from an intermediate
/// artifact: only `id` is required.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StagedRecord {
    pub id: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(skip)]
    pub normalized_value: Option<f64>,
    #[serde(skip)]
    pub processed_at: Option<String>,
}

impl StagedRecord {
    pub fn new(id: i64, value: Option<f64>) -> Self {
        Self {
            id,
            timestamp: None,
            value,
            category: None,
            normalized_value: None,
            processed_at: None,
        }
    }

    /// Converts into the output shape; `value` becomes `original_value`.
    /// Fails if a step that fills a required field did not run.
    pub fn finish(self) -> Result<TransformedRecord, String> {
        let normalized_value = self
            .normalized_value
            .ok_or_else(|| format!("record {}: normalized_value was never set", self.id))?;
        let processed_at = self
            .processed_at
            .ok_or_else(|| format!("record {}: processed_at was never set", self.id))?;
        Ok(TransformedRecord {
            id: self.id,
            timestamp: self
                .timestamp
                .unwrap_or_else(|| EPOCH_ZERO_TIMESTAMP.to_string()),
            original_value: self.value.unwrap_or(DEFAULT_VALUE),
            normalized_value,
            category: self
                .category
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            processed_at,
        })
    }
}

/// One stateless stage of the transformation.
pub trait TransformStep: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, records: Vec<StagedRecord>) -> Vec<StagedRecord>;
}

/// Drops repeated ids (first occurrence wins) and fills missing fields.
pub struct Clean;

impl TransformStep for Clean {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn apply(&self, records: Vec<StagedRecord>) -> Vec<StagedRecord> {
        let mut seen = HashSet::new();
        records
            .into_iter()
            .filter(|r| seen.insert(r.id))
            .map(|mut r| {
                r.value.get_or_insert(DEFAULT_VALUE);
                r.category
                    .get_or_insert_with(|| DEFAULT_CATEGORY.to_string());
                r.timestamp
                    .get_or_insert_with(|| EPOCH_ZERO_TIMESTAMP.to_string());
                r
            })
            .collect()
    }
}

/// Linear min-max scaling of `value` into [-1, 1]. A batch with no spread
/// gets the fixed degenerate value for every record.
pub struct Normalize;

impl TransformStep for Normalize {
    fn name(&self) -> &'static str {
        "normalize"
    }

    fn apply(&self, mut records: Vec<StagedRecord>) -> Vec<StagedRecord> {
        let values = records.iter().map(|r| r.value.unwrap_or(DEFAULT_VALUE));
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

        // Halved operands: the span stays finite for any finite inputs, and
        // results equal 2*(v-min)/(max-min) - 1 wherever that does not overflow.
        let half_span = max / 2.0 - min / 2.0;
        for r in &mut records {
            let v = r.value.unwrap_or(DEFAULT_VALUE);
            r.normalized_value = Some(if max > min {
                2.0 * ((v / 2.0 - min / 2.0) / half_span) - 1.0
            } else {
                DEGENERATE_NORMALIZED_VALUE
            });
        }
        records
    }
}

/// Attaches the wall-clock processing time. Not part of the content hash.
pub struct Stamp;

impl TransformStep for Stamp {
    fn name(&self) -> &'static str {
        "stamp"
    }

    fn apply(&self, mut records: Vec<StagedRecord>) -> Vec<StagedRecord> {
        let now = now_iso();
        for r in &mut records {
            r.processed_at = Some(now.clone());
        }
        records
    }
}

/// Ordered list of steps, built once and reused for every file.
pub struct StepPipeline {
    steps: Vec<Box<dyn TransformStep>>,
}

impl StepPipeline {
    pub fn new(steps: Vec<Box<dyn TransformStep>>) -> Self {
        Self { steps }
    }

    /// Clean, normalize, stamp.
    pub fn standard() -> Self {
        Self::new(vec![Box::new(Clean), Box::new(Normalize), Box::new(Stamp)])
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn apply(&self, records: Vec<StagedRecord>) -> Vec<StagedRecord> {
        self.steps.iter().fold(records, |acc, step| {
            debug!(step = step.name(), records = acc.len(), "Applying step");
            step.apply(acc)
        })
    }
}

impl Default for StepPipeline {
    fn default() -> Self {
        Self::standard()
    }
}
