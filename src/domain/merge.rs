//! Deep merge over JSON values.
//!
//! Used to lay author-declared route contracts over the default error
//! responses, and as a general configuration-merge primitive.
//!
//! Rules, applied key by key over `source`:
//!
//! - `null` in `source` overwrites the target value outright.
//! - Two arrays concatenate, target first, duplicates kept.
//! - Two objects merge recursively.
//! - Anything else in `source` replaces the target value.
//!
//! Timestamps travel as RFC 3339 strings and are therefore replaced by value.
//! The result is always a freshly owned tree; neither input is touched.

use serde_json::{Map, Value};

/// Merges `source` over `target` and returns the combined value.
///
/// When either side is not an object the source wins, except for two arrays
/// which concatenate.
pub fn deep_merge(target: &Value, source: &Value) -> Value {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => Value::Object(merge_maps(target, source)),
        (Value::Array(target), Value::Array(source)) => {
            Value::Array(target.iter().chain(source.iter()).cloned().collect())
        }
        (_, source) => source.clone(),
    }
}

fn merge_maps(target: &Map<String, Value>, source: &Map<String, Value>) -> Map<String, Value> {
    let mut output = target.clone();
    for (key, source_value) in source {
        let merged = match (output.get(key), source_value) {
            (_, Value::Null) => Value::Null,
            (Some(Value::Array(existing)), Value::Array(incoming)) => {
                Value::Array(existing.iter().chain(incoming.iter()).cloned().collect())
            }
            (Some(existing @ Value::Object(_)), Value::Object(_)) => {
                deep_merge(existing, source_value)
            }
            (_, other) => other.clone(),
        };
        output.insert(key.clone(), merged);
    }
    output
}
