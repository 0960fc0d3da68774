use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::metrics::health::overall_status;
use crate::metrics::HealthStatus;
use crate::AppState;

/// Functions fronted by this service. Each gets the same health-check
/// side channel; the `ai` function additionally probes the model API.
pub const FUNCTIONS: &[&str] = &["ai", "auth", "media"];

const HEALTH_CHECK_ACTION: &str = "health-check";

#[derive(Debug, Deserialize)]
pub struct FunctionRequest {
    pub action: String,
}

/// Handler-level health report.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionHealth {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub database: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<HealthStatus>,
    /// Wall time of all probes in ms
    pub response_time: u64,
}

// ─── GET|POST /functions/:service/health ─────────────────────────

pub async fn health(
    State(state): State<Arc<AppState>>,
    Path(service): Path<String>,
) -> Result<(StatusCode, Json<FunctionHealth>), AppError> {
    if !FUNCTIONS.contains(&service.as_str()) {
        return Err(AppError::NotFound(format!("unknown function '{service}'")));
    }

    let t0 = Instant::now();

    let database = state
        .recorder
        .perform_health_check("database", state.store.ping())
        .await
        .status;

    let openai = if service == "ai" {
        let sample = state
            .recorder
            .perform_health_check("openai", state.model_probe.check())
            .await;
        Some(sample.status)
    } else {
        None
    };

    let status = overall_status(std::iter::once(database).chain(openai));
    let code = if status == HealthStatus::Healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((
        code,
        Json(FunctionHealth {
            status,
            timestamp: Utc::now(),
            database,
            openai,
            response_time: t0.elapsed().as_millis() as u64,
        }),
    ))
}

// ─── POST /functions/:service ────────────────────────────────────
/// Only the `health-check` action is served here; everything else the
/// functions do is forwarded elsewhere.

pub async fn invoke(
    state: State<Arc<AppState>>,
    Path(service): Path<String>,
    req: Result<Json<FunctionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FunctionHealth>), AppError> {
    let Json(req) = req?;
    if req.action == HEALTH_CHECK_ACTION {
        return health(state, Path(service)).await;
    }
    if !FUNCTIONS.contains(&service.as_str()) {
        return Err(AppError::NotFound(format!("unknown function '{service}'")));
    }
    Err(AppError::BadRequest(format!(
        "unsupported action '{}' for function '{service}'",
        req.action
    )))
}
