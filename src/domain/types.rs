use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// HTTP methods a domain route may be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Lowercase name, as used for OpenAPI path item keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_ascii_uppercase())
    }
}

/// Documentation tag attached to a route, usually the owning domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One documented response of a route: a description plus a JSON body schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseContract {
    pub description: String,
    pub schema: Value,
}

impl ResponseContract {
    pub fn new(description: impl Into<String>, schema: Value) -> Self {
        Self {
            description: description.into(),
            schema,
        }
    }

    /// OpenAPI response object for this contract.
    pub fn to_openapi(&self) -> Value {
        json!({
            "description": self.description,
            "content": {
                "application/json": { "schema": self.schema }
            }
        })
    }
}

/// Uniform error body returned by every failing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// JSON Schema of the error body, used by the default response contracts.
    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "error": { "type": "string", "description": "Error code identifier" },
                "message": {
                    "type": "string",
                    "description": "Human-readable description of the error"
                }
            },
            "required": ["error", "message"]
        })
    }
}

/// Ordered key path into the KV store, written dotted in URLs (`a.b.c`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KvKey(Vec<String>);

impl KvKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Splits a dotted key path. Empty segments are kept so `a..b` stays distinct.
    pub fn from_dotted(path: &str) -> Self {
        Self::new(path.split('.'))
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &KvKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for KvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Window counter stored per caller identity.
///
/// `window_start_millis` is moved to the time of every admitted request, so
/// the window lapses `window_ms` after the last request that got through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    pub count: u64,
    pub window_start_millis: i64,
}

impl RateLimitRecord {
    /// First request of a fresh window.
    pub fn fresh(now_ms: i64) -> Self {
        Self {
            count: 1,
            window_start_millis: now_ms,
        }
    }

    /// Whether the window this record belongs to is over at `now_ms`.
    pub fn is_expired(&self, now_ms: i64, window_ms: i64) -> bool {
        self.window_start_millis < now_ms - window_ms
    }
}

/// Result of counting one request against a caller's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Record as stored after the hit; unchanged when not admitted.
    pub record: RateLimitRecord,
    pub admitted: bool,
}

/// Why the admission pipeline refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionRejection {
    /// Authorization header absent or not a bearer credential.
    MissingCredential,
    /// Bearer credential present but wrong.
    InvalidCredential,
    /// Caller exhausted its window.
    RateLimited { retry_after_secs: u64 },
}

impl AdmissionRejection {
    /// Label used for the rejection counter.
    pub fn reason(&self) -> &'static str {
        match self {
            AdmissionRejection::MissingCredential => "missing_credential",
            AdmissionRejection::InvalidCredential => "invalid_credential",
            AdmissionRejection::RateLimited { .. } => "rate_limited",
        }
    }
}

/// Per-request verdict of one admission stage. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    Pass,
    Reject(AdmissionRejection),
}

impl AdmissionDecision {
    pub fn is_pass(&self) -> bool {
        matches!(self, AdmissionDecision::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_display_is_uppercase() {
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
        assert_eq!(HttpMethod::Get.as_str(), "get");
    }

    #[test]
    fn test_http_method_serde_lowercase() {
        let json = serde_json::to_string(&HttpMethod::Put).unwrap();
        assert_eq!(json, "\"put\"");
    }

    #[test]
    fn test_kv_key_dotted_roundtrip() {
        let key = KvKey::from_dotted("users.42.profile");
        assert_eq!(key.parts(), ["users", "42", "profile"]);
        assert_eq!(key.to_string(), "users.42.profile");
    }

    #[test]
    fn test_kv_key_prefix() {
        let key = KvKey::from_dotted("users.42.profile");
        assert!(key.starts_with(&KvKey::from_dotted("users")));
        assert!(key.starts_with(&KvKey::from_dotted("users.42")));
        assert!(!key.starts_with(&KvKey::from_dotted("user")));
    }

    #[test]
    fn test_error_response_omits_absent_message() {
        let body = serde_json::to_value(ErrorResponse::new("Internal Server Error")).unwrap();
        assert_eq!(body, json!({ "error": "Internal Server Error" }));
    }

    #[test]
    fn test_rate_limit_record_expiry_boundary() {
        let record = RateLimitRecord::fresh(0);
        assert!(!record.is_expired(60_000, 60_000));
        assert!(record.is_expired(60_001, 60_000));
    }

    #[test]
    fn test_rate_limit_record_serializes_camel_case() {
        let json = serde_json::to_value(RateLimitRecord::fresh(7)).unwrap();
        assert_eq!(json, json!({ "count": 1, "windowStartMillis": 7 }));
    }

    #[test]
    fn test_response_contract_openapi_shape() {
        let contract = ResponseContract::new("ok", json!({ "type": "string" }));
        assert_eq!(
            contract.to_openapi(),
            json!({
                "description": "ok",
                "content": { "application/json": { "schema": { "type": "string" } } }
            })
        );
    }
}
