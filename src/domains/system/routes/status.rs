use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System};

use crate::app::DomainBuilder;
use crate::domain::{AppError, HttpMethod};

#[derive(Debug, Serialize)]
pub struct MemoryUsage {
    /// Resident set size in bytes.
    pub rss: u64,
    #[serde(rename = "virtual")]
    pub virtual_bytes: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Host uptime in seconds.
    pub uptime: u64,
    pub memory_usage: MemoryUsage,
    pub timestamp: String,
}

fn memory_usage() -> Result<MemoryUsage, AppError> {
    let pid = sysinfo::get_current_pid()
        .map_err(|e| AppError::Internal(format!("Cannot resolve own pid: {e}")))?;

    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        true,
        ProcessRefreshKind::nothing().with_memory(),
    );
    let process = system
        .process(pid)
        .ok_or_else(|| AppError::Internal("Own process not visible".to_string()))?;

    Ok(MemoryUsage {
        rss: process.memory(),
        virtual_bytes: process.virtual_memory(),
    })
}

/// Host uptime plus the memory footprint of this process.
pub async fn status_handler() -> Result<Json<StatusResponse>, AppError> {
    Ok(Json(StatusResponse {
        uptime: System::uptime(),
        memory_usage: memory_usage()?,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }))
}

pub fn register(domain: &mut DomainBuilder) {
    domain
        .add_route(HttpMethod::Get, "/status", status_handler)
        .describe_response(
            200,
            "Process status",
            json!({
                "type": "object",
                "properties": {
                    "uptime": { "type": "integer", "minimum": 0, "description": "System uptime in seconds" },
                    "memoryUsage": {
                        "type": "object",
                        "properties": {
                            "rss": { "type": "integer", "minimum": 0 },
                            "virtual": { "type": "integer", "minimum": 0 }
                        },
                        "required": ["rss", "virtual"]
                    },
                    "timestamp": { "type": "string", "format": "date-time" }
                },
                "required": ["uptime", "memoryUsage", "timestamp"]
            }),
        );
}
