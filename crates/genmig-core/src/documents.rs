//! JSON project documents (`package.json`, `.yo-rc.json`)

use crate::error::MigrationError;
use serde_json::{Map, Value};
use std::path::Path;

/// Read a file whose top level must be a JSON object
pub(crate) async fn read_object(path: &Path) -> Result<Map<String, Value>, MigrationError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MigrationError::missing_source(path, e))?;
    parse_object(&text).map_err(|reason| MigrationError::missing_source(path, reason))
}

/// Parse text whose top level must be a JSON object
pub(crate) fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, found {}", kind_of(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Entry for `key` in a state document, which must itself be an object
pub(crate) fn entry<'a>(
    document: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Map<String, Value>, String> {
    match document.get(key) {
        Some(Value::Object(entry)) => Ok(entry),
        Some(other) => Err(format!("entry '{key}' is {}, expected an object", kind_of(other))),
        None => Err(format!("no entry for generator '{key}'")),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
