pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::metrics::records::{CallMetric, ErrorRecord, HealthSample};

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("record encoding: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only backing tables for call metrics, error records and
/// health samples.
///
/// Every write is a single independent insert; implementations give no
/// ordering guarantee between concurrent appends. Reads return whatever
/// has been committed at query time.
#[async_trait]
pub trait MetricsStore: Send + Sync + 'static {
    async fn append_call(&self, metric: &CallMetric) -> Result<(), StoreError>;

    async fn append_error(&self, record: &ErrorRecord) -> Result<(), StoreError>;

    async fn append_health(&self, sample: &HealthSample) -> Result<(), StoreError>;

    /// Calls recorded at or after `since`, oldest first, optionally
    /// restricted to one service.
    async fn calls_since(
        &self,
        since: DateTime<Utc>,
        service: Option<&str>,
    ) -> Result<Vec<CallMetric>, StoreError>;

    /// Health samples recorded at or after `since`, newest first.
    async fn health_since(&self, since: DateTime<Utc>) -> Result<Vec<HealthSample>, StoreError>;

    /// Up to `limit` error records, newest first.
    async fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>, StoreError>;

    /// Cheapest possible round-trip, used by connectivity probes.
    async fn ping(&self) -> Result<(), StoreError>;
}
