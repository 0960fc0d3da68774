use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{TimeDelta, Utc};
use std::sync::Arc;
use std::time::Instant;

use crate::handlers::functions::FUNCTIONS;
use crate::metrics::CallOutcome;
use crate::AppState;

/// Header carrying the authenticated caller, set by the auth layer in
/// front of the functions.
pub const ACTOR_HEADER: &str = "x-user-id";

/// Wraps every `/functions/*` request: records one call metric per
/// request (service = path segment after `/functions/`, action = HTTP
/// method, failure = status >= 400) without waiting for the write, and
/// adds two response headers:
///
///   X-Response-Time-Ms  — handler wall time in milliseconds
///   Server-Timing       — same value in the standard Server-Timing format
pub async fn monitoring_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let service = function_name(&path).map(str::to_owned);
    let actor = req
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let started_at = Utc::now();
    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = elapsed.as_millis().to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Ms", val);
    }
    let server_timing = format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // ── Record ──────────────────────────────────────────────────
    let status = response.status();
    tracing::debug!(
        %method,
        %path,
        status = status.as_u16(),
        elapsed_ms = elapsed.as_millis() as u64,
        "function request"
    );

    if let Some(service) = service {
        let finished_at =
            started_at + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero());
        let success = !(status.is_client_error() || status.is_server_error());
        let mut outcome =
            CallOutcome::new(service, method.as_str(), started_at, finished_at, success)
                .with_actor(actor);
        if !success {
            outcome = outcome.with_error(format!("HTTP {}", status.as_u16()));
        }
        state.recorder.record_call(outcome);
    }

    response
}

/// `/functions/ai/health` → `ai`. Unknown functions are not recorded.
fn function_name(path: &str) -> Option<&str> {
    path.strip_prefix("/functions/")?
        .split('/')
        .next()
        .filter(|s| FUNCTIONS.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_function_segment() {
        assert_eq!(function_name("/functions/ai"), Some("ai"));
        assert_eq!(function_name("/functions/media/health"), Some("media"));
        assert_eq!(function_name("/functions/"), None);
        assert_eq!(function_name("/functions/billing"), None);
        assert_eq!(function_name("/api/metrics"), None);
    }
}
