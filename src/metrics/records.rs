use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Free-form key/value context attached to health samples and error records.
pub type Metadata = HashMap<String, serde_json::Value>;

// ─── Validation ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("service name must not be empty")]
    EmptyService,

    #[error("action name must not be empty")]
    EmptyAction,

    #[error("call finished at {end} before it started at {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

// ─── Enums ───────────────────────────────────────────────────────

/// Probe verdict for one dependency. Ordered by severity so the worst
/// status of a set is simply its maximum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Down => "down",
        }
    }
}

/// Trailing window accepted by metric queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Hour,
    Day,
    Week,
}

impl TimeRange {
    pub fn duration(&self) -> TimeDelta {
        match self {
            Self::Hour => TimeDelta::hours(1),
            Self::Day => TimeDelta::days(1),
            Self::Week => TimeDelta::weeks(1),
        }
    }
}

// ─── Persisted rows ──────────────────────────────────────────────

/// Outcome of one instrumented call. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetric {
    pub id: Uuid,
    pub service_name: String,
    pub action: String,
    pub response_time_ms: u64,
    pub success: bool,
    pub error_message: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One probe result for a named dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSample {
    pub id: Uuid,
    pub service_name: String,
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
}

impl HealthSample {
    pub fn new(
        service_name: impl Into<String>,
        status: HealthStatus,
        response_time_ms: u64,
        error_message: Option<String>,
        metadata: Option<Metadata>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name: service_name.into(),
            status,
            response_time_ms,
            error_message,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Failure detail. Written alongside every failed `CallMetric`, or on
/// its own through `MetricsRecorder::log_error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub id: Uuid,
    pub service_name: String,
    pub action: String,
    pub error_message: String,
    pub stack_trace: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        service_name: impl Into<String>,
        action: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            service_name: service_name.into(),
            action: action.into(),
            error_message: error_message.into(),
            stack_trace: None,
            user_id: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }
}

// ─── Write-side input ────────────────────────────────────────────

/// What an instrumented caller hands to `MetricsRecorder::record_call`.
#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub service: String,
    pub action: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    pub error_message: Option<String>,
    pub stack_trace: Option<String>,
    pub actor_id: Option<String>,
}

impl CallOutcome {
    pub fn new(
        service: impl Into<String>,
        action: impl Into<String>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        success: bool,
    ) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            started_at,
            finished_at,
            success,
            error_message: None,
            stack_trace: None,
            actor_id: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_actor(mut self, actor_id: Option<String>) -> Self {
        self.actor_id = actor_id;
        self
    }

    /// Validate the outcome and split it into the rows to persist.
    /// A failed call yields a linked `ErrorRecord` stamped with the same
    /// service, action, actor and timestamp as its metric.
    pub fn into_records(self) -> Result<(CallMetric, Option<ErrorRecord>), RecordError> {
        if self.service.trim().is_empty() {
            return Err(RecordError::EmptyService);
        }
        if self.action.trim().is_empty() {
            return Err(RecordError::EmptyAction);
        }
        if self.finished_at < self.started_at {
            return Err(RecordError::EndBeforeStart {
                start: self.started_at,
                end: self.finished_at,
            });
        }

        let elapsed_ms = (self.finished_at - self.started_at).num_milliseconds().max(0) as u64;

        let error = (!self.success).then(|| ErrorRecord {
            id: Uuid::new_v4(),
            service_name: self.service.clone(),
            action: self.action.clone(),
            error_message: self
                .error_message
                .clone()
                .unwrap_or_else(|| "unknown error".into()),
            stack_trace: self.stack_trace,
            user_id: self.actor_id.clone(),
            metadata: None,
            created_at: self.finished_at,
        });

        let metric = CallMetric {
            id: Uuid::new_v4(),
            service_name: self.service,
            action: self.action,
            response_time_ms: elapsed_ms,
            success: self.success,
            error_message: self.error_message,
            user_id: self.actor_id,
            created_at: self.finished_at,
        };

        Ok((metric, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool) -> CallOutcome {
        let start = Utc::now();
        CallOutcome::new("ai", "chat", start, start + TimeDelta::milliseconds(250), success)
    }

    #[test]
    fn successful_outcome_has_no_error_record() {
        let (metric, error) = outcome(true).into_records().unwrap();
        assert_eq!(metric.response_time_ms, 250);
        assert!(metric.success);
        assert!(error.is_none());
    }

    #[test]
    fn failed_outcome_links_error_record() {
        let (metric, error) = outcome(false)
            .with_error("upstream timed out")
            .with_stack_trace("at chat()")
            .with_actor(Some("user-7".into()))
            .into_records()
            .unwrap();
        let error = error.expect("failed call must produce an error record");

        assert_eq!(error.service_name, metric.service_name);
        assert_eq!(error.action, metric.action);
        assert_eq!(error.created_at, metric.created_at);
        assert_eq!(error.error_message, "upstream timed out");
        assert_eq!(error.stack_trace.as_deref(), Some("at chat()"));
        assert_eq!(error.user_id.as_deref(), Some("user-7"));
        assert_eq!(metric.error_message.as_deref(), Some("upstream timed out"));
    }

    #[test]
    fn rejects_empty_names_and_reversed_times() {
        let start = Utc::now();
        let end = start + TimeDelta::milliseconds(5);

        let err = CallOutcome::new("", "chat", start, end, true).into_records();
        assert_eq!(err.unwrap_err(), RecordError::EmptyService);

        let err = CallOutcome::new("ai", " ", start, end, true).into_records();
        assert_eq!(err.unwrap_err(), RecordError::EmptyAction);

        let err = CallOutcome::new("ai", "chat", end, start, true).into_records();
        assert!(matches!(err, Err(RecordError::EndBeforeStart { .. })));
    }

    #[test]
    fn zero_length_call_is_allowed() {
        let at = Utc::now();
        let (metric, _) = CallOutcome::new("auth", "login", at, at, true)
            .into_records()
            .unwrap();
        assert_eq!(metric.response_time_ms, 0);
    }

    #[test]
    fn health_status_orders_by_severity() {
        assert!(HealthStatus::Healthy < HealthStatus::Degraded);
        assert!(HealthStatus::Degraded < HealthStatus::Down);
        assert_eq!(
            serde_json::to_string(&HealthStatus::Degraded).unwrap(),
            "\"degraded\""
        );
    }

    #[test]
    fn time_range_parses_lowercase_and_defaults_to_hour() {
        let range: TimeRange = serde_json::from_str("\"week\"").unwrap();
        assert_eq!(range, TimeRange::Week);
        assert_eq!(TimeRange::default().duration(), TimeDelta::hours(1));
    }
}
