//! Documentation, metrics and fallback handlers, plus the HTTP mapping of
//! [`AppError`].

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde_json::Value;

use crate::app::SharedState;
use crate::domain::{AppError, ErrorResponse, StoreError};

/// Unredacted failure detail attached to 5xx responses as an extension.
///
/// The error normalizer logs it and, in production, strips it from the body.
#[derive(Debug, Clone)]
pub struct InternalFailure {
    pub detail: String,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Config(_) | AppError::Assembly(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Uniform `{error, message}` body for `status`.
pub fn error_body(status: StatusCode, message: Option<String>) -> ErrorResponse {
    let error = ErrorResponse::new(status.canonical_reason().unwrap_or("Error"));
    match message {
        Some(message) => error.with_message(message),
        None => error,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        let mut response =
            (status, Json(error_body(status, Some(message.clone())))).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(InternalFailure { detail: message });
        }
        response
    }
}

/// Pre-rendered documentation served at the doc and UI paths.
#[derive(Debug)]
pub struct ApiDocs {
    pub document: Value,
    pub ui_html: String,
}

pub async fn openapi_handler(State(docs): State<Arc<ApiDocs>>) -> Json<Value> {
    Json(docs.document.clone())
}

pub async fn ui_handler(State(docs): State<Arc<ApiDocs>>) -> Html<String> {
    Html(docs.ui_html.clone())
}

/// Prometheus text exposition of the installed recorder.
pub async fn metrics_handler(State(state): State<SharedState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            )],
            handle.render(),
        )
            .into_response(),
        None => AppError::NotFound("metrics recorder is not installed".to_string()).into_response(),
    }
}

pub async fn fallback_handler(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::domain::ValidationError;

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_authentication_error_shape() {
        let response = AppError::Authentication("missing Bearer token".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], "Unauthorized: missing Bearer token");
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited { retry_after_secs: 12 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "12");
        assert!(response.extensions().get::<InternalFailure>().is_none());
    }

    #[tokio::test]
    async fn test_server_errors_carry_internal_failure() {
        let response = AppError::Internal("db exploded".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let failure = response.extensions().get::<InternalFailure>().unwrap();
        assert_eq!(failure.detail, "Internal error: db exploded");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::Store(StoreError::Closed).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Validation(ValidationError::InvalidFormat("x".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("k".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Authorization("no".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn test_fallback_is_not_found() {
        let response = fallback_handler(Uri::from_static("/nope")).await.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "No route for /nope");
    }
}
