//! Small helpers for pulling typed values out of open-ended tool arguments.
//!
//! Arguments arrive as arbitrary JSON from the model; these helpers reject
//! wrong types but perform no schema validation beyond that.

use questkeeper_core::error::ToolError;

/// A required string argument.
pub fn required_str(arguments: &serde_json::Value, key: &str) -> Result<String, ToolError> {
    match arguments.get(key) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
        None => Err(ToolError::InvalidArguments(format!(
            "Missing '{key}' argument"
        ))),
    }
}

/// An optional string argument.
pub fn optional_str(arguments: &serde_json::Value, key: &str) -> Result<Option<String>, ToolError> {
    match arguments.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a string, got {other}"
        ))),
    }
}

/// An optional integer argument. Accepts whole-valued floats, since models
/// routinely emit `1.0` for ids.
pub fn optional_i64(arguments: &serde_json::Value, key: &str) -> Result<Option<i64>, ToolError> {
    match arguments.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                Ok(Some(f as i64))
            } else {
                Err(ToolError::InvalidArguments(format!(
                    "'{key}' must be an integer, got {n}"
                )))
            }
        }
        Some(other) => Err(ToolError::InvalidArguments(format!(
            "'{key}' must be a number, got {other}"
        ))),
    }
}
