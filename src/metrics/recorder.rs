use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::health::SystemHealth;
use super::percentiles::MetricsSummary;
use super::records::{CallOutcome, ErrorRecord, HealthSample, HealthStatus, Metadata, TimeRange};
use crate::store::{MetricsStore, StoreError};

// ─── Configuration ───────────────────────────────────────────────

/// A probe that succeeds but takes longer than this is `degraded`.
pub const DEGRADED_THRESHOLD: Duration = Duration::from_millis(5_000);

/// Trailing window for `get_system_health`.
pub const HEALTH_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default page size for `get_recent_errors`.
pub const DEFAULT_ERROR_LIMIT: usize = 50;

// ─── MetricsRecorder ─────────────────────────────────────────────

/// Records call outcomes and probe results, and answers aggregate
/// queries over them.
///
/// Holds no state besides the store handle: construct one per process
/// and share it behind an `Arc`.
///
/// Writes are best-effort. A failed append is logged and dropped, never
/// returned to the caller. Reads propagate `StoreError`.
pub struct MetricsRecorder {
    store: Arc<dyn MetricsStore>,
}

impl MetricsRecorder {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    // ── Write side ──────────────────────────────────────────────

    /// Fire-and-forget: persist `outcome` on a detached task and return
    /// immediately. Outside a Tokio runtime the outcome is dropped with a
    /// warning.
    pub fn record_call(&self, outcome: CallOutcome) {
        let store = Arc::clone(&self.store);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    persist_call(store.as_ref(), outcome).await;
                });
            }
            Err(_) => warn!(
                service = %outcome.service,
                action = %outcome.action,
                "no async runtime, call metric dropped"
            ),
        }
    }

    /// Same as `record_call` but waits for the writes to finish. Still
    /// never fails.
    pub async fn persist_call(&self, outcome: CallOutcome) {
        persist_call(self.store.as_ref(), outcome).await;
    }

    pub async fn log_error(&self, record: ErrorRecord) {
        if let Err(e) = self.store.append_error(&record).await {
            warn!(
                service = %record.service_name,
                action = %record.action,
                error = %e,
                "failed to log error record"
            );
        }
    }

    /// Store a probe result as given. Status is not re-derived here.
    pub async fn record_health_check(
        &self,
        service_name: &str,
        status: HealthStatus,
        response_time_ms: u64,
        error: Option<String>,
        metadata: Option<Metadata>,
    ) {
        let sample = HealthSample::new(service_name, status, response_time_ms, error, metadata);
        if let Err(e) = self.store.append_health(&sample).await {
            warn!(
                service = %service_name,
                status = status.as_str(),
                error = %e,
                "failed to record health check"
            );
        }
    }

    /// Run `probe`, classify it and record exactly one health sample.
    /// Errors become `down`; success slower than `DEGRADED_THRESHOLD`
    /// becomes `degraded`. Returns the sample that was recorded.
    pub async fn perform_health_check<T, E, Fut>(
        &self,
        service_name: &str,
        probe: Fut,
    ) -> HealthSample
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let start = Instant::now();
        let outcome = probe.await.map(|_| ()).map_err(|e| e.to_string());
        let elapsed = start.elapsed();

        let (status, error) = classify_probe(elapsed, outcome);
        let elapsed_ms = elapsed.as_millis() as u64;
        debug!(service = %service_name, status = status.as_str(), elapsed_ms, "health probe");

        let sample = HealthSample::new(service_name, status, elapsed_ms, error, None);
        if let Err(e) = self.store.append_health(&sample).await {
            warn!(service = %service_name, error = %e, "failed to record health check");
        }
        sample
    }

    /// Await `op`, record its outcome under `service`/`action` without
    /// waiting for the write, and hand back the result untouched.
    pub async fn with_monitoring<T, E, Fut>(
        &self,
        service: &str,
        action: &str,
        actor_id: Option<String>,
        op: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started_at = Utc::now();
        let clock = Instant::now();
        let result = op.await;
        let elapsed = TimeDelta::from_std(clock.elapsed()).unwrap_or(TimeDelta::zero());
        let finished_at = started_at + elapsed;

        let mut outcome = CallOutcome::new(service, action, started_at, finished_at, result.is_ok())
            .with_actor(actor_id);
        if let Err(e) = &result {
            outcome = outcome.with_error(e.to_string());
        }
        self.record_call(outcome);

        result
    }

    // ── Read side ───────────────────────────────────────────────

    pub async fn get_metrics(
        &self,
        service: Option<&str>,
        range: TimeRange,
    ) -> Result<MetricsSummary, StoreError> {
        let since = Utc::now() - range.duration();
        let calls = self.store.calls_since(since, service).await?;
        Ok(MetricsSummary::from_calls(&calls))
    }

    pub async fn get_system_health(&self) -> Result<SystemHealth, StoreError> {
        let since = Utc::now() - TimeDelta::seconds(HEALTH_WINDOW.as_secs() as i64);
        let samples = self.store.health_since(since).await?;
        Ok(SystemHealth::from_samples(samples))
    }

    pub async fn get_recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>, StoreError> {
        self.store.recent_errors(limit).await
    }
}

async fn persist_call(store: &dyn MetricsStore, outcome: CallOutcome) {
    let (metric, error) = match outcome.into_records() {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "dropping invalid call metric");
            return;
        }
    };

    if let Err(e) = store.append_call(&metric).await {
        warn!(
            service = %metric.service_name,
            action = %metric.action,
            error = %e,
            "failed to record call metric"
        );
    }

    if let Some(record) = error {
        if let Err(e) = store.append_error(&record).await {
            warn!(
                service = %record.service_name,
                action = %record.action,
                error = %e,
                "failed to log error record"
            );
        }
    }
}

fn classify_probe(
    elapsed: Duration,
    outcome: Result<(), String>,
) -> (HealthStatus, Option<String>) {
    match outcome {
        Err(message) => (HealthStatus::Down, Some(message)),
        Ok(()) if elapsed > DEGRADED_THRESHOLD => (HealthStatus::Degraded, None),
        Ok(()) => (HealthStatus::Healthy, None),
    }
}
