use crate::{error::PlannerError, schemas::SchemaHandle};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;
use tracing::warn;

const MAX_SCHEMA_ERRORS: usize = 3;

/// Collect schema violations for a structured payload.
///
/// Returns an empty list when the payload conforms. At most
/// `MAX_SCHEMA_ERRORS` violations are reported individually.
pub fn schema_violations(
    schema: &SchemaHandle,
    payload: &Value,
) -> std::result::Result<Vec<String>, PlannerError> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            PlannerError::Validation(format!(
                "Failed to prepare `{}` schema ({}) for validation: {}",
                schema.schema_name(),
                schema.type_name(),
                err
            ))
        })?;

    let mut details = Vec::new();
    if let Err(errors) = validator.validate(payload) {
        for (idx, error) in errors.enumerate() {
            if idx == MAX_SCHEMA_ERRORS {
                details.push("additional errors truncated".to_string());
                break;
            }
            let mut path = error.instance_path.to_string();
            if path.is_empty() {
                path = "<root>".to_string();
            }
            details.push(format!("{}: {}", path, error));
        }
    }

    Ok(details)
}

/// Log schema violations as warnings without rejecting the payload.
///
/// Returns the number of violations found.
pub fn warn_on_violations(schema: &SchemaHandle, payload: &Value) -> usize {
    match schema_violations(schema, payload) {
        Ok(details) => {
            for detail in &details {
                warn!(
                    target: "trip_planner::schema",
                    schema = schema.schema_name(),
                    violation = %detail,
                    "model output does not match schema"
                );
            }
            details.len()
        }
        Err(err) => {
            warn!(target: "trip_planner::schema", error = %err, "schema validation skipped");
            0
        }
    }
}
