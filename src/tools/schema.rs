//! Argument checks against a tool's declared input schema.
//!
//! Covers the subset of JSON Schema the tools declare: `required`, the
//! primitive `type` of each top-level property, and string `enum`s. Nested
//! schemas are left to the tool.

use serde_json::{Map, Value};

/// Checks `arguments` against `schema`.
///
/// # Errors
///
/// Returns a message naming the first offending field.
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<(), String> {
    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if arguments.get(field).map_or(true, Value::is_null) {
                return Err(format!("Missing required parameter: {field}"));
            }
        }
    }

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    for (field, value) in arguments {
        let Some(property) = properties.get(field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        if let Some(expected) = property.get("type").and_then(Value::as_str) {
            if !matches_type(expected, value) {
                return Err(format!(
                    "Invalid parameter '{field}': expected {expected}, got {}",
                    type_name(value)
                ));
            }
        }

        if let Some(allowed) = property.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                let options: Vec<String> = allowed.iter().map(Value::to_string).collect();
                return Err(format!(
                    "Invalid parameter '{field}': must be one of {}",
                    options.join(", ")
                ));
            }
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        // Unknown keywords are not ours to enforce.
        _ => true,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
