use std::time::Duration;

/// Failure modes of the outbound language-model probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("API key not configured")]
    MissingApiKey,

    #[error("model listing failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("probe task aborted: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Connectivity check against the language-model API: a single
/// authenticated `GET {base}/v1/models`. Any non-2xx reply is a failure.
#[derive(Clone)]
pub struct ModelApiProbe {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ModelApiProbe {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            timeout,
        }
    }

    pub fn models_url(&self) -> String {
        format!("{}/v1/models", self.base_url.trim_end_matches('/'))
    }

    /// `ureq` is blocking, so the request runs on the blocking pool.
    pub async fn check(&self) -> Result<(), ProbeError> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(ProbeError::MissingApiKey);
        };
        let url = self.models_url();
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || -> Result<(), ProbeError> {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            agent
                .get(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .call()?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn models_url_tolerates_trailing_slash() {
        let probe = ModelApiProbe::new("https://api.example.com/", None, Duration::from_secs(1));
        assert_eq!(probe.models_url(), "https://api.example.com/v1/models");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let probe = ModelApiProbe::new("http://127.0.0.1:9", Some("  ".into()), Duration::from_secs(1));
        assert!(matches!(probe.check().await, Err(ProbeError::MissingApiKey)));
    }
}
