use std::env;

use serde::Deserialize;

/// What the pipeline does when the duplicate check itself fails.
///
/// The permissive mode skips duplicate protection for that candidate and is
/// opt-in only; the default turns the failed check into an error outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckFailurePolicy {
    Error,
    Proceed,
}

impl Default for CheckFailurePolicy {
    fn default() -> Self {
        CheckFailurePolicy::Error
    }
}

/// Client-side configuration for the ingestion orchestrator.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    /// Base URL of the report backend, e.g. `http://localhost:8002/api`.
    pub base_url: String,
    /// Connect timeout for all requests, seconds.
    pub connect_timeout_secs: u64,
    /// Per-request timeout for check/persist/history calls, seconds.
    /// Task streams are long-lived and exempt.
    pub request_timeout_secs: u64,
    /// Policy when the duplicate check fails before persist.
    pub on_check_failure: CheckFailurePolicy,
    /// Capacity of the progress/decision broadcast channels.
    pub event_capacity: usize,
    /// Attribution recorded by the backend on persisted uploads.
    pub created_by: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8002/api".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 120,
            on_check_failure: CheckFailurePolicy::default(),
            event_capacity: 100,
            created_by: None,
        }
    }
}

impl ClientConfig {
    /// Builds a config from defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("REPORTFLOW_BASE_URL") {
            config.base_url = url;
        }
        if let Some(secs) = env_u64("REPORTFLOW_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = env_u64("REPORTFLOW_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = secs;
        }
        if let Ok(value) = env::var("REPORTFLOW_ON_CHECK_FAILURE") {
            match value.as_str() {
                "proceed" => config.on_check_failure = CheckFailurePolicy::Proceed,
                "error" => config.on_check_failure = CheckFailurePolicy::Error,
                other => {
                    log::warn!("Unknown REPORTFLOW_ON_CHECK_FAILURE value '{}', keeping default", other);
                }
            }
        }
        if let Ok(user) = env::var("REPORTFLOW_CREATED_BY") {
            if !user.trim().is_empty() {
                config.created_by = Some(user);
            }
        }
        config
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.on_check_failure, CheckFailurePolicy::Error);
        assert_eq!(config.event_capacity, 100);
        assert!(config.created_by.is_none());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"baseUrl": "http://reports.internal/api", "onCheckFailure": "proceed"}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://reports.internal/api");
        assert_eq!(config.on_check_failure, CheckFailurePolicy::Proceed);
        assert_eq!(config.request_timeout_secs, 120);
    }
}
