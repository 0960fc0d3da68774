use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::monitoring;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    // ── Instrumented function endpoints ─────────────────────────
    let functions = Router::new()
        .route("/functions/:service", post(handlers::functions::invoke))
        .route(
            "/functions/:service/health",
            get(handlers::functions::health).post(handlers::functions::health),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            monitoring::monitoring_middleware,
        ));

    Router::new()
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Health & errors ─────────────────────────────────────
        .route("/api/health", get(handlers::health::system_health))
        .route(
            "/api/health-checks",
            post(handlers::health::record_health_check),
        )
        .route("/api/errors", get(handlers::health::recent_errors))
        .merge(functions)
        .fallback(handlers::not_found)
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        .layer(CorsLayer::permissive())
}
