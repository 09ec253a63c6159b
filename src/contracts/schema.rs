use super::records::OutputData;
use crate::error::{ContractViolation, EtlError, Result};
use jsonschema::JSONSchema;
use once_cell::sync::OnceCell;
use serde_json::Value;

const OUTPUT_SCHEMA_SOURCE: &str = include_str!("../../schemas/output_data.v1.json");

// jsonschema 0.17 borrows the schema document for the validator's lifetime
static OUTPUT_SCHEMA_JSON: OnceCell<Value> = OnceCell::new();
static OUTPUT_SCHEMA: OnceCell<JSONSchema> = OnceCell::new();

/// The compiled OutputData v1 schema, compiled once per process.
pub fn output_schema() -> Result<&'static JSONSchema> {
    OUTPUT_SCHEMA.get_or_try_init(|| {
        let json = OUTPUT_SCHEMA_JSON.get_or_try_init(|| serde_json::from_str(OUTPUT_SCHEMA_SOURCE))?;
        JSONSchema::options()
            .compile(json)
            .map_err(|e| EtlError::Config(format!("Failed to compile output schema: {}", e)))
    })
}

/// Checks structure with the JSON schema, then semantic rules on the typed value.
pub fn parse_output_data(instance: Value) -> Result<OutputData> {
    let schema = output_schema()?;
    if let Err(errors) = schema.validate(&instance) {
        let violations = errors
            .map(|e| format!("{} at '{}'", e, e.instance_path))
            .collect();
        return Err(ContractViolation { violations }.into());
    }

    let data: OutputData = serde_json::from_value(instance)?;
    data.validate()?;
    Ok(data)
}
