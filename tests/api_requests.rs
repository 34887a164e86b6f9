//! Request flows through the fully assembled API.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use sloth_rest::api::create_router;
use sloth_rest::app::{AppConfig, AppState, Environment, Loader, RateLimitConfig};
use sloth_rest::domain::KvStore;
use sloth_rest::domains;
use sloth_rest::infra::MemoryKvStore;
use sloth_rest::test_utils::{MockConfig, MockKvStore};

const TOKEN: &str = "test-token";

fn dev_config() -> AppConfig {
    AppConfig {
        environment: Environment::Development,
        bearer_token: Some(SecretString::from(TOKEN.to_string())),
        ..AppConfig::default()
    }
}

async fn build_app(config: AppConfig, store: Arc<dyn KvStore>) -> Router {
    let state = Arc::new(AppState::new(config, store));
    let assembly = Loader::new(domains::registry()).load().await.unwrap();
    create_router(state, &assembly).unwrap()
}

async fn dev_app() -> Router {
    build_app(dev_config(), Arc::new(MemoryKvStore::new())).await
}

fn authed(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = dev_app().await;

    let request = Request::builder()
        .uri("/app/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn test_wrong_token_is_403() {
    let app = dev_app().await;

    let request = Request::builder()
        .uri("/app/health")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_empty_bearer_token_is_401() {
    let app = dev_app().await;

    let request = Request::builder()
        .uri("/app/health")
        .header(header::AUTHORIZATION, "Bearer ")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_401() {
    let app = dev_app().await;

    let request = Request::builder()
        .uri("/app/health")
        .header(header::AUTHORIZATION, format!("Basic {TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_token_reaches_handler() {
    let app = dev_app().await;

    let response = app
        .oneshot(authed("GET", "/app").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({ "message": "API is running" }));
}

#[tokio::test]
async fn test_status_reports_process_memory() {
    let app = dev_app().await;

    let response = app
        .oneshot(authed("GET", "/app/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["uptime"].is_u64());
    assert!(body["memoryUsage"]["rss"].as_u64().unwrap() > 0);
    assert!(body["memoryUsage"]["virtual"].is_u64());
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_no_configured_token_lets_requests_through() {
    let config = AppConfig {
        bearer_token: None,
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    let request = Request::builder()
        .uri("/app/version")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_fail_closed_without_token_is_401() {
    let config = AppConfig {
        bearer_token: None,
        auth_fail_closed: true,
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    let request = Request::builder()
        .uri("/app/version")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_docs_are_public() {
    let app = dev_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/doc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let document = body_json(response).await;
    assert_eq!(document["openapi"], "3.0.0");
    assert!(document["paths"]["/app/kv/{keypath}"]["put"].is_object());

    let response = app
        .oneshot(Request::builder().uri("/ui").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));
}

#[tokio::test]
async fn test_unknown_route_is_404_json() {
    let app = dev_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nowhere")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_kv_lifecycle() {
    let app = dev_app().await;

    // 1. PUT a value
    let response = app
        .clone()
        .oneshot(
            authed("PUT", "/app/kv/users.42")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"value":{"name":"Ada"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "key": "users.42", "stored": true })
    );

    // 2. GET it back
    let response = app
        .clone()
        .oneshot(authed("GET", "/app/kv/users.42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "name": "Ada" }));

    // 3. List under the prefix
    let response = app
        .clone()
        .oneshot(
            authed("GET", "/app/kv/users?list=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let keys = body["keys"].as_array().unwrap();
    assert!(keys.contains(&json!("users.42")));

    // 4. DELETE
    let response = app
        .clone()
        .oneshot(authed("DELETE", "/app/kv/users.42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "key": "users.42" }));

    // 5. GET after delete
    let response = app
        .oneshot(authed("GET", "/app/kv/users.42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Key not found");
}

#[tokio::test]
async fn test_kv_put_rejects_zero_ttl() {
    let app = dev_app().await;

    let response = app
        .oneshot(
            authed("PUT", "/app/kv/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"value":"x","ttl":0}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Bad Request");
}

#[tokio::test]
async fn test_kv_put_rejects_malformed_json() {
    let app = dev_app().await;

    let response = app
        .oneshot(
            authed("PUT", "/app/kv/session")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_kv_undecodable_key_is_json_400() {
    let app = dev_app().await;

    let response = app
        .oneshot(authed("GET", "/app/kv/%FF").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Bad Request");
}

#[tokio::test]
async fn test_kv_delete_of_missing_key_succeeds() {
    let app = dev_app().await;

    let response = app
        .oneshot(authed("DELETE", "/app/kv/ghost").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_degraded_when_store_fails() {
    let store = Arc::new(MockKvStore::with_config(MockConfig::failure("disk gone")));
    let app = build_app(dev_config(), store).await;

    let response = app
        .oneshot(authed("GET", "/app/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "degraded");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_production_store_failure_is_redacted() {
    let config = AppConfig {
        environment: Environment::Production,
        ..dev_config()
    };
    let store = Arc::new(MockKvStore::with_config(MockConfig::failure(
        "secret internals",
    )));
    let app = build_app(config, store).await;

    let response = app
        .oneshot(authed("GET", "/app/kv/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().contains_key("x-error-id"));
    let body = body_json(response).await;
    assert_eq!(body, json!({ "error": "Internal Server Error" }));
}

#[tokio::test]
async fn test_development_store_failure_keeps_detail() {
    let store = Arc::new(MockKvStore::with_config(MockConfig::failure(
        "secret internals",
    )));
    let app = build_app(dev_config(), store).await;

    let response = app
        .oneshot(authed("GET", "/app/kv/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("secret internals"));
}

#[tokio::test]
async fn test_rate_limit_in_production() {
    let config = AppConfig {
        environment: Environment::Production,
        rate_limit: RateLimitConfig {
            max: 2,
            window_ms: 60_000,
        },
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    for expected_remaining in ["1", "0"] {
        let response = app
            .clone()
            .oneshot(
                authed("GET", "/app/version")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = app
        .clone()
        .oneshot(
            authed("GET", "/app/version")
                .header("x-forwarded-for", "203.0.113.9")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    // Rejected before the security headers layer runs
    assert!(!response.headers().contains_key("x-frame-options"));
    assert_eq!(body_json(response).await["error"], "Too Many Requests");

    // A different caller still has its own window
    let response = app
        .oneshot(
            authed("GET", "/app/version")
                .header("x-forwarded-for", "198.51.100.7")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_applies_before_authentication() {
    let config = AppConfig {
        environment: Environment::Production,
        rate_limit: RateLimitConfig {
            max: 1,
            window_ms: 60_000,
        },
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    let unauthenticated = || {
        Request::builder()
            .uri("/app/version")
            .header("x-real-ip", "192.0.2.1")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.clone().oneshot(unauthenticated()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(unauthenticated()).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_kv_routes_cannot_touch_rate_limit_windows() {
    let config = AppConfig {
        environment: Environment::Production,
        rate_limit: RateLimitConfig {
            max: 2,
            window_ms: 60_000,
        },
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    // No forwarding headers and no peer address: the caller is "unknown"
    let response = app
        .clone()
        .oneshot(
            authed("PUT", "/app/kv/ratelimit.unknown")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"value":{"count":0,"windowStartMillis":0}}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            authed("GET", "/app/kv/ratelimit?list=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "keys": ["ratelimit.unknown"] })
    );

    // The overwrite above did not reset the caller's window
    let response = app
        .oneshot(authed("GET", "/app/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_security_headers_in_production() {
    let config = AppConfig {
        environment: Environment::Production,
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    let response = app
        .oneshot(Request::builder().uri("/doc").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("strict-transport-security"));
}

#[tokio::test]
async fn test_cors_preflight_in_production() {
    let config = AppConfig {
        environment: Environment::Production,
        app_url: "https://app.example.com".to_string(),
        ..dev_config()
    };
    let app = build_app(config, Arc::new(MemoryKvStore::new())).await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/app/kv/a")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.example.com"
    );
}
