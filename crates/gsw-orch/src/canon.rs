//! Canonical JSON encoding shared by status files, the result log and reports.

use gsw_core::errors::{ErrorInfo, GswError};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

fn json_error(code: &str, err: impl ToString) -> GswError {
    GswError::Serde(ErrorInfo::new(code, err.to_string()))
}

// Object keys are re-inserted in sorted order at every depth so the output
// does not depend on whether `preserve_order` is enabled somewhere in the graph.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, sort_keys(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Serializes a value into compact JSON with sorted keys.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, GswError> {
    let value = serde_json::to_value(value).map_err(|err| json_error("json_serialize", err))?;
    serde_json::to_vec(&sort_keys(value)).map_err(|err| json_error("json_write", err))
}

/// Canonical JSON followed by a newline, as stored in `results.jsonl`.
pub fn to_canonical_json_line<T: Serialize>(value: &T) -> Result<Vec<u8>, GswError> {
    let mut bytes = to_canonical_json_bytes(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Decodes JSON produced by this module.
pub fn from_json_slice<T: DeserializeOwned>(data: &[u8]) -> Result<T, GswError> {
    serde_json::from_slice(data).map_err(|err| json_error("json_deserialize", err))
}

/// Hex SHA-256 of the canonical JSON encoding.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, GswError> {
    let digest = Sha256::digest(to_canonical_json_bytes(value)?);
    Ok(format!("{:x}", digest))
}
