//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub uploads: CheckResult,
}

#[derive(Serialize)]
pub struct CheckResult {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    fn up(latency_ms: Option<u64>) -> Self {
        Self {
            status: "up".to_string(),
            latency_ms,
            error: None,
        }
    }

    fn down(error: String) -> Self {
        Self {
            status: "down".to_string(),
            latency_ms: None,
            error: Some(error),
        }
    }

    fn is_up(&self) -> bool {
        self.status == "up"
    }
}

/// Liveness probe - always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: patentdesk_common::VERSION,
    })
}

/// Readiness probe - database round trip and upload directory
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = std::time::Instant::now();

    let database = match state.db.ping().await {
        Ok(_) => CheckResult::up(Some(start.elapsed().as_millis() as u64)),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness: database unreachable");
            CheckResult::down(e.public_message())
        }
    };

    let uploads = match tokio::fs::metadata(&state.config.uploads.dir).await {
        Ok(meta) if meta.is_dir() => CheckResult::up(None),
        Ok(_) => CheckResult::down("upload path is not a directory".to_string()),
        Err(e) => CheckResult::down(e.to_string()),
    };

    let all_healthy = database.is_up() && uploads.is_up();
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            status: if all_healthy { "ready" } else { "not_ready" }.to_string(),
            checks: HealthChecks { database, uploads },
        }),
    )
}
