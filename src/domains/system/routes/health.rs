use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::app::{DomainBuilder, SharedState};
use crate::domain::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Seconds since the server started.
    pub uptime: u64,
    /// ISO 8601 UTC, e.g. `2025-05-08T12:34:56Z`.
    pub timestamp: String,
}

/// Reports `degraded` when the store health check fails.
pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let status = match state.store.health_check().await {
        Ok(()) => HealthStatus::Ok,
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            HealthStatus::Degraded
        }
    };

    Json(HealthResponse {
        status,
        uptime: state.uptime_secs(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Get, "/health", health_handler)
        .describe_response(
            200,
            "Overall service health",
            json!({
                "type": "object",
                "properties": {
                    "status": {
                        "type": "string",
                        "enum": ["ok", "degraded"],
                        "description": "\"ok\" if all systems are operational, \"degraded\" if some checks failed"
                    },
                    "uptime": { "type": "integer", "minimum": 0, "description": "Seconds since start" },
                    "timestamp": { "type": "string", "format": "date-time" }
                },
                "required": ["status", "uptime", "timestamp"]
            }),
        );
}
