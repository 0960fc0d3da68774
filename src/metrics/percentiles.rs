use serde::Serialize;

use super::records::CallMetric;

/// Aggregate view over the call metrics of one query window.
/// Serialized straight into the JSON API and the SSE stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub total_requests: u64,
    /// Percentage in `0.0..=100.0`.
    pub success_rate: f64,
    /// Mean latency in ms, rounded to the nearest integer.
    pub avg_response_time: u64,
    pub p95: u64,
    pub p99: u64,
    pub error_count: u64,
}

impl MetricsSummary {
    /// Summarize a window of calls. Returns the all-zero summary for an
    /// empty window.
    pub fn from_calls(calls: &[CallMetric]) -> Self {
        if calls.is_empty() {
            return Self::empty();
        }

        let total = calls.len() as u64;
        let successes = calls.iter().filter(|c| c.success).count() as u64;

        let mut latencies: Vec<u64> = calls.iter().map(|c| c.response_time_ms).collect();
        latencies.sort_unstable();

        let sum: u64 = latencies.iter().sum();
        let avg = (sum as f64 / total as f64).round() as u64;

        Self {
            total_requests: total,
            success_rate: 100.0 * successes as f64 / total as f64,
            avg_response_time: avg,
            p95: nearest_rank_floor(&latencies, 0.95),
            p99: nearest_rank_floor(&latencies, 0.99),
            error_count: total - successes,
        }
    }

    /// All-zero placeholder used when no calls fall inside the window.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.total_requests > 0
    }
}

/// Value at index `floor(q * N)` of an ascending slice, clamped to the
/// last element. No interpolation: small samples under-report the tail.
pub fn nearest_rank_floor(sorted: &[u64], q: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let idx = (q * sorted.len() as f64).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
