use super::timestamp::is_iso8601;
use crate::error::{ContractViolation, RowError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One validated CSV row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub id: i64,
    pub timestamp: String,
    /// `None` for an empty cell; written as `null` and filled downstream.
    pub value: Option<f64>,
    pub category: String,
}

impl InputRecord {
    /// Validates a header-keyed raw row. String fields are trimmed first.
    pub fn from_row(row: &HashMap<String, String>) -> Result<Self, RowError> {
        let field = |name: &str| -> Result<&str, RowError> {
            row.get(name)
                .map(|v| v.trim())
                .ok_or_else(|| RowError::new(name, "field is missing"))
        };

        let id = parse_id(field("id")?)?;
        if id <= 0 {
            return Err(RowError::new("id", format!("must be greater than 0, got {}", id)));
        }

        let timestamp = field("timestamp")?;
        if !is_iso8601(timestamp) {
            return Err(RowError::new(
                "timestamp",
                format!("invalid ISO 8601 timestamp: {}", timestamp),
            ));
        }

        let value = parse_value(row.get("value").map(|v| v.trim()).unwrap_or(""))?;

        let category = field("category")?;
        if category.is_empty() {
            return Err(RowError::new("category", "must not be empty"));
        }

        Ok(Self {
            id,
            timestamp: timestamp.to_string(),
            value,
            category: category.to_string(),
        })
    }
}

fn parse_value(raw: &str) -> Result<Option<f64>, RowError> {
    if raw.is_empty() {
        return Ok(None);
    }
    let value: f64 = raw
        .parse()
        .map_err(|_| RowError::new("value", format!("not a number: '{}'", raw)))?;
    if !value.is_finite() {
        return Err(RowError::new("value", format!("must be finite, got {}", raw)));
    }
    Ok(Some(value))
}

/// Integer literal, or an integral float literal such as `3.0`.
fn parse_id(raw: &str) -> Result<i64, RowError> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(id);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(RowError::new("id", format!("not an integer: '{}'", raw))),
    }
}

/// A record after cleaning, normalization and stamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub id: i64,
    pub timestamp: String,
    pub original_value: f64,
    pub normalized_value: f64,
    pub category: String,
    pub processed_at: String,
}

impl TransformedRecord {
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !is_iso8601(&self.timestamp) {
            out.push(format!(
                "record {}: invalid timestamp '{}'",
                self.id, self.timestamp
            ));
        }
        if !is_iso8601(&self.processed_at) {
            out.push(format!(
                "record {}: invalid processed_at '{}'",
                self.id, self.processed_at
            ));
        }
        if !self.original_value.is_finite() {
            out.push(format!("record {}: original_value must be finite", self.id));
        }
        if !(-1.0..=1.0).contains(&self.normalized_value) {
            out.push(format!(
                "record {}: normalized_value {} outside [-1, 1]",
                self.id, self.normalized_value
            ));
        }
        out
    }
}

/// Validates a consolidated record list before it is emitted.
pub fn validate_records(records: &[TransformedRecord]) -> Result<(), ContractViolation> {
    let mut violations: Vec<String> = records.iter().flat_map(|r| r.violations()).collect();
    if records.is_empty() {
        violations.push("records must contain at least one record".to_string());
    }
    if records.windows(2).any(|w| w[0].id > w[1].id) {
        violations.push("records must be sorted ascending by id".to_string());
    }
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ContractViolation { violations })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMetadata {
    pub total_records: u64,
    pub execution_time_seconds: f64,
    pub data_hash: String,
    pub generated_at: String,
}

impl OutputMetadata {
    pub fn violations(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !(self.execution_time_seconds.is_finite() && self.execution_time_seconds >= 0.0) {
            out.push(format!(
                "execution_time_seconds must be >= 0, got {}",
                self.execution_time_seconds
            ));
        }
        if !is_sha256_hex(&self.data_hash) {
            out.push("data_hash must be 64 lowercase hex characters".to_string());
        }
        if !is_iso8601(&self.generated_at) {
            out.push(format!("invalid generated_at '{}'", self.generated_at));
        }
        out
    }
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// The transformer artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputData {
    pub records: Vec<TransformedRecord>,
    pub metadata: OutputMetadata,
}

impl OutputData {
    pub fn validate(&self) -> Result<(), ContractViolation> {
        let mut violations = match validate_records(&self.records) {
            Ok(()) => Vec::new(),
            Err(v) => v.violations,
        };
        violations.extend(self.metadata.violations());
        if self.metadata.total_records != self.records.len() as u64 {
            violations.push(format!(
                "total_records {} does not match {} records",
                self.metadata.total_records,
                self.records.len()
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ContractViolation { violations })
        }
    }
}

/// The `metadata.json` sidecar written next to a published artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublisherMetadata {
    pub published_at: String,
    pub source_file: String,
    pub total_records: u64,
    pub data_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_row() -> HashMap<String, String> {
        row(&[
            ("id", "1"),
            ("timestamp", "2024-01-15T10:30:00Z"),
            ("value", "42.5"),
            ("category", "  sensor_a "),
        ])
    }

    fn transformed(id: i64, normalized: f64) -> TransformedRecord {
        TransformedRecord {
            id,
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            original_value: 42.5,
            normalized_value: normalized,
            category: "sensor_a".to_string(),
            processed_at: "2024-01-15T10:30:00Z".to_string(),
        }
    }

    fn output(records: Vec<TransformedRecord>) -> OutputData {
        OutputData {
            metadata: OutputMetadata {
                total_records: records.len() as u64,
                execution_time_seconds: 0.123,
                data_hash: "a".repeat(64),
                generated_at: "2024-01-15T10:30:00Z".to_string(),
            },
            records,
        }
    }

    #[test]
    fn valid_row_is_trimmed_and_typed() {
        let rec = InputRecord::from_row(&valid_row()).unwrap();
        assert_eq!(rec.id, 1);
        assert_eq!(rec.value, Some(42.5));
        assert_eq!(rec.category, "sensor_a");
    }

    #[test]
    fn row_rejections_name_the_field() {
        let cases = [
            ("id", "-5", "id"),
            ("id", "0", "id"),
            ("id", "abc", "id"),
            ("timestamp", "invalid_timestamp", "timestamp"),
            ("value", "abc", "value"),
            ("value", "NaN", "value"),
            ("value", "-inf", "value"),
            ("category", "   ", "category"),
        ];
        for (key, raw, field) in cases {
            let mut r = valid_row();
            r.insert(key.to_string(), raw.to_string());
            let err = InputRecord::from_row(&r).unwrap_err();
            assert_eq!(err.field, field, "{}={:?}", key, raw);
        }
    }

    #[test]
    fn empty_value_is_kept_as_missing() {
        let mut r = valid_row();
        r.insert("value".to_string(), "  ".to_string());
        let rec = InputRecord::from_row(&r).unwrap();
        assert_eq!(rec.value, None);

        let json = serde_json::to_value(&rec).unwrap();
        assert!(json["value"].is_null());

        r.remove("value");
        assert_eq!(InputRecord::from_row(&r).unwrap().value, None);
    }

    #[test]
    fn id_is_not_part_of_the_output_contract() {
        assert!(transformed(0, 0.0).violations().is_empty());
    }

    #[test]
    fn integral_float_id_is_accepted() {
        let mut r = valid_row();
        r.insert("id".to_string(), "3.0".to_string());
        assert_eq!(InputRecord::from_row(&r).unwrap().id, 3);
        r.insert("id".to_string(), "3.5".to_string());
        assert!(InputRecord::from_row(&r).is_err());
    }

    #[test]
    fn output_data_accepts_well_formed_artifact() {
        assert!(output(vec![transformed(1, 0.5), transformed(2, -0.3)])
            .validate()
            .is_ok());
    }

    #[test]
    fn output_data_rejects_empty_unsorted_and_miscounted() {
        assert!(output(vec![]).validate().is_err());
        assert!(output(vec![transformed(2, 0.0), transformed(1, 0.0)])
            .validate()
            .is_err());

        let mut miscounted = output(vec![transformed(1, 0.0)]);
        miscounted.metadata.total_records = 5;
        let err = miscounted.validate().unwrap_err();
        assert!(err.violations[0].contains("total_records"));
    }

    #[test]
    fn output_data_rejects_out_of_range_and_bad_hash() {
        let mut data = output(vec![transformed(1, 1.5)]);
        data.metadata.data_hash = "A".repeat(64);
        let err = data.validate().unwrap_err();
        assert_eq!(err.violations.len(), 2);
    }
}
