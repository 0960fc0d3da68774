//! Call metrics and health aggregation for the marketplace functions.
//!
//! The [`metrics::MetricsRecorder`] records call outcomes and probe
//! results into a [`store::MetricsStore`] and answers latency, success
//! rate and health queries over them. The binary exposes it over HTTP.

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod probe;
pub mod server;
pub mod store;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// Backing tables; also probed directly by the function health checks.
    pub store: Arc<dyn store::MetricsStore>,

    /// The one recorder for this process. Handlers record through it and
    /// the query endpoints read through it.
    pub recorder: Arc<metrics::MetricsRecorder>,

    /// Outbound check used by the `ai` function's health check.
    pub model_probe: probe::ModelApiProbe,

    /// Tick of the SSE metrics stream.
    pub stream_interval: Duration,
}
