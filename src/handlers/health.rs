use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics::records::{ErrorRecord, HealthStatus, Metadata};
use crate::metrics::recorder::DEFAULT_ERROR_LIMIT;
use crate::metrics::SystemHealth;
use crate::AppState;

/// Upper bound on `?limit=` for the error feed.
const MAX_ERROR_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ErrorsQuery {
    pub limit: Option<usize>,
}

/// Body of `POST /api/health-checks`, for probe drivers running
/// outside this process.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckReport {
    pub service_name: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub metadata: Option<Metadata>,
}

// ─── GET /api/health ─────────────────────────────────────────────

pub async fn system_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemHealth>, AppError> {
    Ok(Json(state.recorder.get_system_health().await?))
}

// ─── GET /api/errors ─────────────────────────────────────────────

pub async fn recent_errors(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ErrorsQuery>, QueryRejection>,
) -> Result<Json<Vec<ErrorRecord>>, AppError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ERROR_LIMIT)
        .min(MAX_ERROR_LIMIT);
    Ok(Json(state.recorder.get_recent_errors(limit).await?))
}

// ─── POST /api/health-checks ─────────────────────────────────────

pub async fn record_health_check(
    State(state): State<Arc<AppState>>,
    report: Result<Json<HealthCheckReport>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(report) = report?;
    if report.service_name.trim().is_empty() {
        return Err(AppError::BadRequest("serviceName must not be empty".into()));
    }

    state
        .recorder
        .record_health_check(
            &report.service_name,
            report.status,
            report.response_time_ms,
            report.error_message,
            report.metadata,
        )
        .await;

    Ok(StatusCode::ACCEPTED)
}
