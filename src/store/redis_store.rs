use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{MetricsStore, StoreError};
use crate::metrics::records::{CallMetric, ErrorRecord, HealthSample};

/// Redis-backed store. Each table is a sorted set scored by the record's
/// `createdAt` in epoch microseconds, with the JSON-encoded record as the
/// member. Record ids keep otherwise identical rows distinct.
///
/// Redis breaks score ties by member bytes, which start with a random id,
/// so every read re-sorts the decoded rows on the full-precision
/// `createdAt` and re-applies the window bound client-side.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on failure, so
/// every call clones it instead of holding a lock.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    prefix: String,
}

#[derive(Debug, Clone, Copy)]
enum Table {
    Calls,
    Errors,
    Health,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Self::Calls => "api_metrics",
            Self::Errors => "error_logs",
            Self::Health => "health_checks",
        }
    }
}

impl RedisStore {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    fn key(&self, table: Table) -> String {
        table_key(&self.prefix, table)
    }

    async fn append<T: Serialize + Sync>(
        &self,
        table: Table,
        at: DateTime<Utc>,
        record: &T,
    ) -> Result<(), StoreError> {
        let member = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(self.key(table), member, score(at)).await?;
        Ok(())
    }
}

// ─── Pure helpers ────────────────────────────────────────────────

fn table_key(prefix: &str, table: Table) -> String {
    format!("{prefix}:{}", table.name())
}

/// Microseconds since the epoch stay below 2^53 for the next few
/// centuries, so the score round-trips exactly through Redis' doubles.
fn score(at: DateTime<Utc>) -> i64 {
    at.timestamp_micros()
}

/// `ZREVRANGE` stop index for the `limit` newest members; `None` when
/// nothing should be fetched.
fn stop_index(limit: usize) -> Option<isize> {
    if limit == 0 {
        return None;
    }
    Some(isize::try_from(limit).unwrap_or(isize::MAX) - 1)
}

fn decode<T: DeserializeOwned>(members: Vec<String>) -> Result<Vec<T>, StoreError> {
    members
        .iter()
        .map(|m| serde_json::from_str(m).map_err(StoreError::from))
        .collect()
}

/// Calls at or after `since`, for `service` if given, oldest first.
fn select_calls(
    mut calls: Vec<CallMetric>,
    since: DateTime<Utc>,
    service: Option<&str>,
) -> Vec<CallMetric> {
    calls.retain(|c| c.created_at >= since && service.map_or(true, |s| c.service_name == s));
    calls.sort_by_key(|c| c.created_at);
    calls
}

/// Stable sort, newest first. Rows with identical timestamps keep the
/// order Redis returned them in.
fn newest_first<T>(mut rows: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
    rows
}

#[async_trait]
impl MetricsStore for RedisStore {
    async fn append_call(&self, metric: &CallMetric) -> Result<(), StoreError> {
        self.append(Table::Calls, metric.created_at, metric).await
    }

    async fn append_error(&self, record: &ErrorRecord) -> Result<(), StoreError> {
        self.append(Table::Errors, record.created_at, record).await
    }

    async fn append_health(&self, sample: &HealthSample) -> Result<(), StoreError> {
        self.append(Table::Health, sample.created_at, sample).await
    }

    async fn calls_since(
        &self,
        since: DateTime<Utc>,
        service: Option<&str>,
    ) -> Result<Vec<CallMetric>, StoreError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrangebyscore(self.key(Table::Calls), score(since), "+inf")
            .await?;
        Ok(select_calls(decode(members)?, since, service))
    }

    async fn health_since(&self, since: DateTime<Utc>) -> Result<Vec<HealthSample>, StoreError> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrevrangebyscore(self.key(Table::Health), "+inf", score(since))
            .await?;
        let mut samples: Vec<HealthSample> = decode(members)?;
        samples.retain(|s| s.created_at >= since);
        Ok(newest_first(samples, |s: &HealthSample| s.created_at))
    }

    async fn recent_errors(&self, limit: usize) -> Result<Vec<ErrorRecord>, StoreError> {
        let Some(stop) = stop_index(limit) else {
            return Ok(Vec::new());
        };
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.zrevrange(self.key(Table::Errors), 0, stop).await?;
        Ok(newest_first(decode(members)?, |e: &ErrorRecord| e.created_at))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("unexpected PING reply {pong:?}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::HealthStatus;
    use chrono::TimeDelta;
    use uuid::Uuid;

    fn call(service: &str, at: DateTime<Utc>) -> CallMetric {
        CallMetric {
            id: Uuid::new_v4(),
            service_name: service.into(),
            action: "POST".into(),
            response_time_ms: 1,
            success: true,
            error_message: None,
            user_id: None,
            created_at: at,
        }
    }

    #[test]
    fn keys_are_namespaced_per_table() {
        assert_eq!(table_key("monitor", Table::Calls), "monitor:api_metrics");
        assert_eq!(table_key("monitor", Table::Errors), "monitor:error_logs");
        assert_eq!(table_key("staging", Table::Health), "staging:health_checks");
    }

    #[test]
    fn decode_rejects_corrupt_members() {
        let result: Result<Vec<CallMetric>, _> = decode(vec!["{not json".into()]);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[test]
    fn score_separates_calls_within_one_millisecond() {
        let at = Utc::now();
        let later = at + TimeDelta::microseconds(250);
        assert!(score(later) > score(at));
        assert_eq!(score(at) as f64 as i64, score(at));
    }

    #[test]
    fn stop_index_covers_exactly_limit_members() {
        assert_eq!(stop_index(0), None);
        assert_eq!(stop_index(1), Some(0));
        assert_eq!(stop_index(50), Some(49));
        assert_eq!(stop_index(usize::MAX), Some(isize::MAX - 1));
    }

    #[test]
    fn select_calls_bounds_window_inclusively_and_filters_service() {
        let since = Utc::now();
        let calls = vec![
            call("ai", since + TimeDelta::seconds(2)),
            call("auth", since + TimeDelta::seconds(1)),
            call("ai", since),
            call("ai", since - TimeDelta::microseconds(1)),
        ];

        let all = select_calls(calls.clone(), since, None);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].created_at, since);

        let ai = select_calls(calls, since, Some("ai"));
        let times: Vec<_> = ai.iter().map(|c| c.created_at).collect();
        assert_eq!(times, vec![since, since + TimeDelta::seconds(2)]);
    }

    #[test]
    fn newest_first_orders_same_millisecond_rows_by_timestamp() {
        let at = Utc::now();
        let mut first = HealthSample::new("database", HealthStatus::Down, 1, None, None);
        first.created_at = at;
        let mut second = HealthSample::new("database", HealthStatus::Healthy, 2, None, None);
        second.created_at = at + TimeDelta::microseconds(300);

        // Redis may hand the pair back in either order.
        let by_time = |s: &HealthSample| s.created_at;
        let rows = newest_first(vec![first.clone(), second.clone()], by_time);
        assert_eq!(rows, vec![second.clone(), first.clone()]);
        let rows = newest_first(vec![second.clone(), first.clone()], by_time);
        assert_eq!(rows, vec![second, first]);
    }
}
