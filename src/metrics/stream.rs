use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::percentiles::MetricsSummary;
use super::records::TimeRange;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsQuery {
    pub service: Option<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

// ─── GET /api/metrics ────────────────────────────────────────────
/// One `MetricsSummary` for `?service=&timeRange=`.

pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MetricsQuery>, QueryRejection>,
) -> Result<Json<MetricsSummary>, AppError> {
    let Query(query) = query?;
    let summary = state
        .recorder
        .get_metrics(query.service.as_deref(), query.time_range)
        .await?;
    Ok(Json(summary))
}

// ─── GET /api/metrics/stream ─────────────────────────────────────
/// Server-Sent Events endpoint.
/// Pushes a fresh `MetricsSummary` every `stream_interval`. A failed
/// query is sent as an `error` event instead of a stale summary.

pub async fn metrics_stream(
    State(state): State<Arc<AppState>>,
    query: Result<Query<MetricsQuery>, QueryRejection>,
) -> Result<Sse<ReceiverStream<Result<Event, Infallible>>>, AppError> {
    let Query(query) = query?;
    let (tx, rx) = mpsc::channel(4);
    let interval = state.stream_interval;

    // Exits once the client disconnects and the receiver is dropped.
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let event = match state
                .recorder
                .get_metrics(query.service.as_deref(), query.time_range)
                .await
            {
                Ok(summary) => Event::default()
                    .event("metrics")
                    .json_data(&summary)
                    .unwrap_or_else(|e| Event::default().event("error").data(e.to_string())),
                Err(e) => Event::default().event("error").data(e.to_string()),
            };
            if tx.send(Ok(event)).await.is_err() {
                break;
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
