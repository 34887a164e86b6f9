//! Admission-control middlewares and the top-level error normalizer.
//!
//! Layer order, outermost first:
//!
//! ```text
//! trace -> error normalizer -> cors* -> rate limit* -> security headers*
//!       -> catch panic -> bearer auth (domain routes only) -> handler
//! ```
//!
//! `*` production only.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tower_http::cors::CorsLayer;
use tracing::{error, warn};
use uuid::Uuid;

use crate::app::{KvRateLimiter, SharedState};
use crate::domain::{AdmissionDecision, AdmissionRejection, AppError, ConfigError};
use crate::infra::observability::{
    record_admission_rejection, record_handler_failure, record_rate_limit_decision,
};

use super::handlers::{InternalFailure, error_body};

/// Correlates a redacted response with the logged failure.
pub const ERROR_ID_HEADER: &str = "x-error-id";

/// Constant-time comparison of two byte slices to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Token of an `Authorization: Bearer <token>` header, trimmed.
pub fn bearer_token(authorization: Option<&HeaderValue>) -> Option<&str> {
    authorization
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Checks the request credential against the configured token.
///
/// Absent, malformed or empty header is a missing credential (401); any other
/// token than the expected one is an invalid credential (403).
pub fn authenticate(expected: &SecretString, authorization: Option<&HeaderValue>) -> AdmissionDecision {
    let Some(provided) = bearer_token(authorization) else {
        return AdmissionDecision::Reject(AdmissionRejection::MissingCredential);
    };

    // Compare via SHA-256 digests so the comparison time is independent of the token
    let expected_hash = Sha256::digest(expected.expose_secret().as_bytes());
    let provided_hash = Sha256::digest(provided.as_bytes());

    if constant_time_eq(expected_hash.as_slice(), provided_hash.as_slice()) {
        AdmissionDecision::Pass
    } else {
        AdmissionDecision::Reject(AdmissionRejection::InvalidCredential)
    }
}

fn reject(rejection: AdmissionRejection, request: &Request<Body>) -> Response {
    warn!(
        reason = rejection.reason(),
        method = %request.method(),
        path = %request.uri().path(),
        "Request rejected by admission control"
    );
    record_admission_rejection(rejection.reason());
    AppError::from(rejection).into_response()
}

/// Bearer authentication in front of the domain routes.
///
/// Without a configured token every request passes with a warning, unless
/// `AUTH_FAIL_CLOSED` is set, in which case every request gets a 401.
pub async fn bearer_auth_middleware(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = state.config.bearer_token.as_ref() else {
        if state.config.auth_fail_closed {
            warn!("Server misconfigured: no BEARER_TOKEN set, rejecting request");
            record_admission_rejection("auth_not_configured");
            return AppError::Authentication("authentication is not configured".to_string())
                .into_response();
        }
        warn!("Server misconfigured: no BEARER_TOKEN set, authentication disabled");
        return next.run(request).await;
    };

    match authenticate(expected, request.headers().get(header::AUTHORIZATION)) {
        AdmissionDecision::Pass => next.run(request).await,
        AdmissionDecision::Reject(rejection) => reject(rejection, &request),
    }
}

fn first_header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Caller identity used as the rate limit key.
///
/// First `X-Forwarded-For` entry, then `X-Real-IP`, then the peer address,
/// then `unknown`; unknown callers share one window.
pub fn client_identity<B>(request: &Request<B>) -> String {
    first_header_value(request.headers(), "x-forwarded-for")
        .or_else(|| first_header_value(request.headers(), "x-real-ip"))
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Per-caller rate limiting keyed by [`client_identity`].
///
/// A store failure admits the request.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<KvRateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let identity = client_identity(&request);

    let status = match limiter.check(&identity).await {
        Ok(status) => status,
        Err(e) => {
            warn!(error = %e, identity = %identity, "Rate limiter store failed, admitting request");
            record_rate_limit_decision("store_error");
            return next.run(request).await;
        }
    };

    let mut response = match status.decision {
        AdmissionDecision::Pass => {
            record_rate_limit_decision("passed");
            next.run(request).await
        }
        AdmissionDecision::Reject(rejection) => {
            record_rate_limit_decision("limited");
            reject(rejection, &request)
        }
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(status.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(status.remaining));
    response
}

/// Attaches the hardening headers to every response.
pub async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=63072000; includeSubDomains; preload"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("no-referrer"),
    );
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );
    response
}

/// CORS restricted to the configured application origin.
pub fn cors_layer(app_url: &str) -> Result<CorsLayer, ConfigError> {
    let origin = HeaderValue::from_str(app_url).map_err(|e| ConfigError::InvalidValue {
        key: "APP_URL".to_string(),
        message: e.to_string(),
    })?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

/// Turns a caught panic into a 500 the normalizer can log and redact.
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "handler panicked".to_string()
    };

    AppError::Internal(detail).into_response()
}

/// Logs every server failure and, in production, replaces its body with the
/// canonical reason plus an `X-Error-Id` header.
pub async fn error_normalizer(
    State(state): State<SharedState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    let status = response.status();
    let Some(failure) = response.extensions_mut().remove::<InternalFailure>() else {
        return response;
    };

    let error_id = Uuid::new_v4();
    record_handler_failure(status.as_u16());
    error!(
        %error_id,
        status = status.as_u16(),
        %method,
        path = %path,
        detail = %failure.detail,
        "Request failed"
    );

    if !state.config.is_production() {
        return response;
    }

    let mut redacted = (status, Json(error_body(status, None))).into_response();
    if let Ok(value) = HeaderValue::from_str(&error_id.to_string()) {
        redacted.headers_mut().insert(ERROR_ID_HEADER, value);
    }
    redacted
}
