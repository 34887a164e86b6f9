use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use crate::app::{DomainBuilder, SharedState};
use crate::domain::{AppError, ErrorResponse, HttpMethod, KvKey, ValidationError};
use crate::domains::kv::schemas::{KeyResponse, key_path_params, key_response};

/// Removes `keypath`. Succeeds whether or not the key existed.
pub async fn delete_handler(
    State(state): State<SharedState>,
    keypath: Result<Path<String>, PathRejection>,
) -> Result<Json<KeyResponse>, AppError> {
    let Path(keypath) =
        keypath.map_err(|e| AppError::Validation(ValidationError::InvalidFormat(e.body_text())))?;
    let key = KvKey::from_dotted(&keypath);
    state.store.delete(&key).await?;
    Ok(Json(KeyResponse {
        key: key.to_string(),
    }))
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Delete, "/{keypath}", delete_handler)
        .params(key_path_params())
        .describe_response(200, "Key removed", key_response())
        .describe_response(400, "Malformed key", ErrorResponse::schema());
}
