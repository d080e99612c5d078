use serde_json::{Map, Value};

use crate::error::RecordError;

/// Parsed form of a stored record: the top-level JSON object, an unordered
/// mapping from field name to value.
pub type StructuredRecord = Map<String, Value>;

/// Decodes a cell value as UTF-8 text and parses it as a JSON object.
///
/// Parsing is total-or-failing: anything short of a well-formed top-level
/// object (bad bytes, bad JSON, a bare array or scalar) is a parse failure
/// and the record contributes nothing.
pub fn parse(bytes: &[u8]) -> Result<StructuredRecord, RecordError> {
    let text = std::str::from_utf8(bytes).map_err(|e| RecordError::Parse {
        cause: format!("invalid UTF-8: {e}"),
    })?;
    let value: Value = serde_json::from_str(text).map_err(|e| RecordError::Parse {
        cause: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RecordError::Parse {
            cause: format!("expected a JSON object, got {}", type_name(&other)),
        }),
    }
}

/// Looks up the configured aggregation field and returns its string value.
pub fn extract<'a>(record: &'a StructuredRecord, field: &str) -> Result<&'a str, RecordError> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s),
        _ => Err(RecordError::FieldMissing {
            field: field.to_string(),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
