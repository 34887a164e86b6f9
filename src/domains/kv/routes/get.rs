use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::{DomainBuilder, SharedState};
use crate::domain::{AppError, ErrorResponse, HttpMethod, KvKey, ValidationError};
use crate::domains::kv::schemas::{GetQuery, KeysResponse, key_path_params, list_query};

/// Value at `keypath`, or with `?list=true` every key under it.
pub async fn get_handler(
    State(state): State<SharedState>,
    keypath: Result<Path<String>, PathRejection>,
    query: Result<Query<GetQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Path(keypath) =
        keypath.map_err(|e| AppError::Validation(ValidationError::InvalidFormat(e.body_text())))?;
    let Query(query) =
        query.map_err(|e| AppError::Validation(ValidationError::InvalidFormat(e.body_text())))?;
    let key = KvKey::from_dotted(&keypath);

    if query.list_mode() {
        let keys = state
            .store
            .list(&key)
            .await?
            .into_iter()
            .map(|(key, _)| key.to_string())
            .collect();
        return Ok(Json(KeysResponse { keys }).into_response());
    }

    match state.store.get(&key).await? {
        Some(value) => Ok(Json(value).into_response()),
        None => Err(AppError::NotFound("Key not found".to_string())),
    }
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Get, "/{keypath}", get_handler)
        .params(key_path_params())
        .query(list_query())
        .describe_response(200, "Stored value, or the key list in list mode", json!({}))
        .describe_response(400, "Malformed key or query", ErrorResponse::schema())
        .describe_response(404, "Key not found", ErrorResponse::schema());
}
