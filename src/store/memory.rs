use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{MetricsStore, StoreError};
use crate::metrics::records::{CallMetric, ErrorRecord, HealthSample};

/// In-process store for local runs and tests. Rows live until the
/// process exits.
///
/// `fail_writes` / `fail_reads` make every append or query return
/// `StoreError::Unavailable`, which is how tests exercise the
/// best-effort and propagating paths of the recorder.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

#[derive(Default)]
struct Tables {
    calls: Vec<CallMetric>,
    errors: Vec<ErrorRecord>,
    health: Vec<HealthSample>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<CallMetric> {
        self.tables.lock().calls.clone()
    }

    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.tables.lock().errors.clone()
    }

    pub fn health_samples(&self) -> Vec<HealthSample> {
        self.tables.lock().health.clone()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejecting writes".into()));
        }
        Ok(())
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store rejecting reads".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn append_call(&self, metric: &CallMetric) -> Result<(), StoreError> {
        self.check_write()?;
        self.tables.lock().calls.push(metric.clone());
        Ok(())
    }

    async fn append_error(&self, record: &ErrorRecord) -> Result<(), StoreError> {
        self.check_write()?;
        self.tables.lock().errors.push(record.clone());
        Ok(())
    }

    async fn append_health(&self, sample: &HealthSample) -> Result<(), StoreError> {
        self.check_write()?;
        self.tables.lock().health.push(sample.clone());
        Ok(())
    }

    async fn calls_since(
        &self,
        since: DateTime<Utc>,
        service: Option<&str>,
    ) -> Result<Vec<CallMetric>, StoreError> {
        self.check_read()?;
        let mut calls: Vec<CallMetric> = self
            .tables
            .lock()
            .calls
            .iter()
            .filter(|c| c.created_at >= since)
            .filter(|c| service.map_or(true, |s| c.service_name == s))
            .cloned()
            .collect();
        calls.sort_by_key(|c| c.created_at);
        Ok(calls)
    }

    async fn health_since(&self, since: DateTime<Utc>) -> Result<Vec<HealthSample>, StoreError> {
        self.check_read()?;
        let mut samples: Vec<HealthSample> = self
            .tables
            .lock()
            .health
            .iter()
            .filter(|s| s.created_at >= since)
            .cloned()
            .collect();
        // Stable sort, reversed: equal timestamps keep last-appended first.
        samples.reverse();
        samples.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(samples)
    }

    async fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>, StoreError> {
        self.check_read()?;
        let mut errors = self.tables.lock().errors.clone();
        errors.reverse();
        errors.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        errors.truncate(limit);
        Ok(errors)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::records::HealthStatus;
    use chrono::TimeDelta;
    use uuid::Uuid;

    fn call_at(service: &str, at: DateTime<Utc>) -> CallMetric {
        CallMetric {
            id: Uuid::new_v4(),
            service_name: service.into(),
            action: "POST".into(),
            response_time_ms: 10,
            success: true,
            error_message: None,
            user_id: None,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn calls_since_filters_by_window_and_service() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.append_call(&call_at("ai", now)).await.unwrap();
        store.append_call(&call_at("auth", now)).await.unwrap();
        store
            .append_call(&call_at("ai", now - TimeDelta::hours(2)))
            .await
            .unwrap();

        let since = now - TimeDelta::hours(1);
        assert_eq!(store.calls_since(since, None).await.unwrap().len(), 2);

        let ai = store.calls_since(since, Some("ai")).await.unwrap();
        assert_eq!(ai.len(), 1);
        assert_eq!(ai[0].service_name, "ai");
    }

    #[tokio::test]
    async fn health_and_errors_come_back_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();

        for (i, minutes) in [3, 1, 2].into_iter().enumerate() {
            let mut sample = HealthSample::new("db", HealthStatus::Healthy, i as u64, None, None);
            sample.created_at = now - TimeDelta::minutes(minutes);
            store.append_health(&sample).await.unwrap();

            let mut error = ErrorRecord::new("ai", "chat", format!("e{i}"));
            error.created_at = now - TimeDelta::minutes(minutes);
            store.append_error(&error).await.unwrap();
        }

        let health = store.health_since(now - TimeDelta::minutes(10)).await.unwrap();
        let order: Vec<u64> = health.iter().map(|s| s.response_time_ms).collect();
        assert_eq!(order, vec![1, 2, 0]);

        let errors = store.recent_errors(2).await.unwrap();
        let order: Vec<&str> = errors.iter().map(|e| e.error_message.as_str()).collect();
        assert_eq!(order, vec!["e1", "e2"]);
    }

    #[tokio::test]
    async fn fault_injection_fails_the_selected_side() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        assert!(store.append_call(&call_at("ai", Utc::now())).await.is_err());
        assert!(store.calls().is_empty());
        assert!(store.ping().await.is_ok());

        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(store.append_call(&call_at("ai", Utc::now())).await.is_ok());
        assert!(store.calls_since(Utc::now(), None).await.is_err());
        assert!(store.ping().await.is_err());
    }
}
