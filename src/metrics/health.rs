use std::collections::HashSet;

use serde::Serialize;

use super::records::{HealthSample, HealthStatus};

/// Current status per dependency plus the worst of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemHealth {
    pub services: Vec<HealthSample>,
    pub overall_status: HealthStatus,
}

impl SystemHealth {
    /// Collapse a newest-first list of samples to one per service (the
    /// first seen wins) and derive the overall status from them.
    pub fn from_samples(samples: Vec<HealthSample>) -> Self {
        let mut seen = HashSet::new();
        let services: Vec<HealthSample> = samples
            .into_iter()
            .filter(|s| seen.insert(s.service_name.clone()))
            .collect();

        let overall_status = overall_status(services.iter().map(|s| s.status));
        Self {
            services,
            overall_status,
        }
    }
}

/// Any `down` wins, then any `degraded`, otherwise `healthy`.
pub fn overall_status(statuses: impl IntoIterator<Item = HealthStatus>) -> HealthStatus {
    statuses
        .into_iter()
        .max()
        .unwrap_or(HealthStatus::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, Utc};

    fn sample(name: &str, status: HealthStatus, ms: u64) -> HealthSample {
        HealthSample::new(name, status, ms, None, None)
    }

    #[test]
    fn no_samples_is_healthy() {
        let health = SystemHealth::from_samples(Vec::new());
        assert!(health.services.is_empty());
        assert_eq!(health.overall_status, HealthStatus::Healthy);
    }

    #[test]
    fn degraded_beats_healthy_and_down_beats_both() {
        let mut samples = vec![
            sample("A", HealthStatus::Healthy, 5),
            sample("B", HealthStatus::Degraded, 5),
        ];
        assert_eq!(
            SystemHealth::from_samples(samples.clone()).overall_status,
            HealthStatus::Degraded
        );

        samples.push(sample("C", HealthStatus::Down, 5));
        assert_eq!(
            SystemHealth::from_samples(samples).overall_status,
            HealthStatus::Down
        );
    }

    #[test]
    fn single_down_outweighs_many_healthy() {
        let mut samples: Vec<_> = (0..20)
            .map(|i| sample(&format!("svc-{i}"), HealthStatus::Healthy, 1))
            .collect();
        samples.push(sample("db", HealthStatus::Down, 1));
        assert_eq!(
            SystemHealth::from_samples(samples).overall_status,
            HealthStatus::Down
        );
    }

    #[test]
    fn most_recent_sample_per_service_wins() {
        let now = Utc::now();
        let mut newest = sample("database", HealthStatus::Healthy, 12);
        newest.created_at = now;
        let mut older = sample("database", HealthStatus::Down, 900);
        older.created_at = now - TimeDelta::minutes(2);

        let health = SystemHealth::from_samples(vec![newest.clone(), older]);

        assert_eq!(health.services, vec![newest]);
        assert_eq!(health.overall_status, HealthStatus::Healthy);
    }
}
