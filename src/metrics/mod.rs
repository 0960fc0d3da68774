pub mod health;
pub mod percentiles;
pub mod recorder;
pub mod records;
pub mod stream;

pub use health::SystemHealth;
pub use percentiles::MetricsSummary;
pub use recorder::MetricsRecorder;
pub use records::{CallOutcome, HealthStatus, TimeRange};
