use std::time::Duration;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde_json::json;
use tracing::debug;
use validator::Validate;

use crate::app::{DomainBuilder, SharedState};
use crate::domain::{AppError, ErrorResponse, HttpMethod, KvKey, ValidationError};
use crate::domains::kv::schemas::{PutValueRequest, StoredResponse, key_path_params, put_body};

/// Stores `value` at `keypath`, expiring after `ttl` milliseconds when given.
pub async fn set_handler(
    State(state): State<SharedState>,
    keypath: Result<Path<String>, PathRejection>,
    payload: Result<Json<PutValueRequest>, JsonRejection>,
) -> Result<Json<StoredResponse>, AppError> {
    let Path(keypath) =
        keypath.map_err(|e| AppError::Validation(ValidationError::InvalidFormat(e.body_text())))?;
    let Json(request) =
        payload.map_err(|e| AppError::Validation(ValidationError::InvalidFormat(e.body_text())))?;
    request.validate()?;

    let key = KvKey::from_dotted(&keypath);
    let ttl = request.ttl.map(Duration::from_millis);
    state.store.set(&key, request.value, ttl).await?;
    debug!(key = %key, ?ttl, "Stored KV entry");

    Ok(Json(StoredResponse {
        key: key.to_string(),
        stored: true,
    }))
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Put, "/{keypath}", set_handler)
        .params(key_path_params())
        .body(put_body())
        .describe_response(
            200,
            "Value stored",
            json!({
                "type": "object",
                "properties": {
                    "key": { "type": "string" },
                    "stored": { "type": "boolean" }
                },
                "required": ["key", "stored"]
            }),
        )
        .describe_response(400, "Invalid body", ErrorResponse::schema());
}
