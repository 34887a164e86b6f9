use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::app::DomainBuilder;
use crate::app::openapi::VERSION;
use crate::domain::HttpMethod;

#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: String,
}

/// Crate version plus the `GIT_COMMIT` the binary was deployed with.
pub async fn version_handler() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: VERSION,
        commit: std::env::var("GIT_COMMIT")
            .ok()
            .filter(|commit| !commit.is_empty())
            .unwrap_or_else(|| "unknown".to_string()),
    })
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Get, "/version", version_handler)
        .describe_response(
            200,
            "Project version",
            json!({
                "type": "object",
                "properties": {
                    "version": { "type": "string" },
                    "commit": { "type": "string", "description": "Current commit SHA if available" }
                },
                "required": ["version", "commit"]
            }),
        );
}
