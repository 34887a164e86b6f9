//! Request types and JSON Schemas shared by the KV routes.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use validator::Validate;

/// Body of `PUT /kv/{keypath}`.
#[derive(Debug, Deserialize, Validate)]
pub struct PutValueRequest {
    /// Any JSON value.
    pub value: Value,
    /// Expiry in milliseconds.
    #[validate(range(min = 1, message = "ttl must be a positive number of milliseconds"))]
    pub ttl: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
    pub list: Option<String>,
}

impl GetQuery {
    pub fn list_mode(&self) -> bool {
        self.list.as_deref() == Some("true")
    }
}

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct StoredResponse {
    pub key: String,
    pub stored: bool,
}

#[derive(Debug, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

pub fn key_path_params() -> Value {
    json!({
        "type": "object",
        "properties": {
            "keypath": {
                "type": "string",
                "description": "Key path, e.g. \"path.of.resource\""
            }
        },
        "required": ["keypath"]
    })
}

pub fn list_query() -> Value {
    json!({
        "type": "object",
        "properties": {
            "list": {
                "type": "string",
                "description": "If set to true, lists all keys under the keypath prefix"
            }
        }
    })
}

pub fn put_body() -> Value {
    json!({
        "type": "object",
        "properties": {
            "value": { "description": "Any JSON-compatible value to store at this key" },
            "ttl": {
                "type": "integer",
                "minimum": 1,
                "description": "Optional TTL in milliseconds"
            }
        },
        "required": ["value"]
    })
}

pub fn key_response() -> Value {
    json!({
        "type": "object",
        "properties": { "key": { "type": "string" } },
        "required": ["key"]
    })
}
