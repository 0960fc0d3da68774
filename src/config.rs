use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};

/// Backing store for the metric tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    /// Sorted sets in Redis (durable, shared between processes).
    Redis,
    /// Process-local tables, lost on exit.
    Memory,
}

/// Runtime configuration. Every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "service-monitor", version, about = "Call metrics and health aggregation service")]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "MONITOR_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    #[arg(long, value_enum, env = "MONITOR_STORE", default_value = "redis")]
    pub store: StoreKind,

    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/")]
    pub redis_url: String,

    /// Namespace for the Redis keys
    #[arg(long, env = "MONITOR_KEY_PREFIX", default_value = "monitor")]
    pub key_prefix: String,

    /// Tick of the SSE metrics stream
    #[arg(long, env = "MONITOR_STREAM_INTERVAL_MS", default_value_t = 1_000)]
    pub stream_interval_ms: u64,

    /// Base URL of the language-model API probed by the `ai` health check
    #[arg(long, env = "AI_API_BASE", default_value = "https://api.openai.com")]
    pub ai_api_base: String,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub ai_api_key: Option<String>,

    /// Timeout for the outbound model-listing probe
    #[arg(long, env = "AI_PROBE_TIMEOUT_MS", default_value_t = 10_000)]
    pub ai_probe_timeout_ms: u64,
}

impl Config {
    pub fn stream_interval(&self) -> Duration {
        Duration::from_millis(self.stream_interval_ms.max(100))
    }

    pub fn ai_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_probe_timeout_ms)
    }
}
