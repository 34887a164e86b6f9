use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::app::DomainBuilder;
use crate::domain::HttpMethod;

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "API is running",
    })
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Get, "/", root_handler)
        .describe_response(
            200,
            "Liveness message",
            json!({
                "type": "object",
                "properties": { "message": { "type": "string" } },
                "required": ["message"]
            }),
        );
}
