use etl_pipeline::contracts::parse_output_data;
use etl_pipeline::error::EtlError;
use jsonschema::JSONSchema;
use serde_json::json;

fn compiled_schema() -> JSONSchema {
    let schema = include_str!("../schemas/output_data.v1.json");
    let schema_json: serde_json::Value = serde_json::from_str(schema).unwrap();
    let schema_static: &'static serde_json::Value = Box::leak(Box::new(schema_json));
    JSONSchema::options().compile(schema_static).unwrap()
}

fn valid_instance() -> serde_json::Value {
    serde_json::from_str(include_str!("resources/output_valid.json")).unwrap()
}

#[test]
fn valid_example_passes_schema_and_semantic_checks() {
    assert!(compiled_schema().is_valid(&valid_instance()));
    let data = parse_output_data(valid_instance()).unwrap();
    assert_eq!(data.records.len(), 2);
    assert_eq!(data.metadata.total_records, 2);
}

#[test]
fn malformed_hash_is_rejected() {
    let mut invalid = valid_instance();
    invalid["metadata"]["data_hash"] = json!("NOTAHEX");
    assert!(!compiled_schema().is_valid(&invalid), "hash pattern should fail");

    let err = parse_output_data(invalid).unwrap_err();
    match err {
        EtlError::Contract(violation) => {
            assert!(violation.violations.iter().any(|v| v.contains("/metadata/data_hash")));
        }
        other => panic!("expected contract violation, got {:?}", other),
    }
}

#[test]
fn normalized_value_outside_unit_interval_is_rejected() {
    let mut invalid = valid_instance();
    invalid["records"][0]["normalized_value"] = json!(1.5);
    assert!(!compiled_schema().is_valid(&invalid));
}

#[test]
fn empty_records_are_rejected() {
    let mut invalid = valid_instance();
    invalid["records"] = json!([]);
    invalid["metadata"]["total_records"] = json!(0);
    assert!(!compiled_schema().is_valid(&invalid));
    assert!(parse_output_data(invalid).is_err());
}

#[test]
fn missing_processed_at_is_rejected() {
    let mut invalid = valid_instance();
    invalid["records"][1]
        .as_object_mut()
        .unwrap()
        .remove("processed_at");
    assert!(!compiled_schema().is_valid(&invalid));
}

// Structurally fine, so only the typed checks catch these
#[test]
fn count_mismatch_passes_schema_but_fails_semantics() {
    let mut invalid = valid_instance();
    invalid["metadata"]["total_records"] = json!(3);
    assert!(compiled_schema().is_valid(&invalid));
    assert!(matches!(parse_output_data(invalid), Err(EtlError::Contract(_))));
}

#[test]
fn unsorted_ids_pass_schema_but_fail_semantics() {
    let mut invalid = valid_instance();
    invalid["records"][0]["id"] = json!(5);
    assert!(compiled_schema().is_valid(&invalid));
    assert!(matches!(parse_output_data(invalid), Err(EtlError::Contract(_))));
}

#[test]
fn non_iso_timestamp_passes_schema_but_fails_semantics() {
    let mut invalid = valid_instance();
    invalid["records"][0]["timestamp"] = json!("yesterday");
    assert!(compiled_schema().is_valid(&invalid));
    assert!(parse_output_data(invalid).is_err());
}
