//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which backends are tried and in what order,
//! how often each one is retried, the chain-wide throttle, and the API keys
//! for paid backends. It deserializes from the `[search]` table of the
//! application config; missing fields take the defaults below.

use crate::error::SearchError;
use crate::types::{BackendId, BackendKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the search fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Attempts per backend before the chain moves on.
    pub max_attempts: u32,
    /// Fixed delay between attempts for generic failures.
    pub retry_delay_ms: u64,
    /// Base delay for rate-limited attempts, doubled on every attempt.
    pub rate_limit_base_ms: u64,
    /// Upper bound of the random jitter added to rate-limit delays.
    pub rate_limit_jitter_ms: u64,
    /// Minimum time between two chain invocations.
    pub min_interval_ms: u64,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Results kept per backend.
    pub max_results: usize,
    /// Custom User-Agent. If `None`, rotates through a built-in list.
    pub user_agent: Option<String>,
    /// Interface language passed to scraping targets (`hl`, `setlang`, `kl`)
    /// and sent as `Accept-Language`.
    pub language: String,
    /// Free backends, in priority order.
    pub free_backends: Vec<BackendId>,
    /// Paid backends, tried only after every free backend failed.
    pub paid_backends: Vec<BackendId>,
    /// API keys for paid backends.
    pub credentials: SearchCredentials,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            retry_delay_ms: 1000,
            rate_limit_base_ms: 1000,
            rate_limit_jitter_ms: 1000,
            min_interval_ms: 1000,
            timeout_seconds: 10,
            max_results: 5,
            user_agent: None,
            language: "es".to_owned(),
            free_backends: vec![
                BackendId::DuckDuckGoLite,
                BackendId::DuckDuckGoHtml,
                BackendId::GoogleScrape,
                BackendId::BingScrape,
            ],
            paid_backends: vec![
                BackendId::GooglePse,
                BackendId::Exa,
                BackendId::You,
                BackendId::Tavily,
            ],
            credentials: SearchCredentials::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_attempts`, `max_results` and `timeout_seconds` must be greater than 0
    /// - at least one backend must be enabled
    /// - backends must be listed under their own tier
    /// - `rate_limit_jitter_ms` must be <= `rate_limit_base_ms`, so that
    ///   rate-limit delays never shrink between attempts
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_attempts == 0 {
            return Err(SearchError::Config(
                "max_attempts must be greater than 0".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.free_backends.is_empty() && self.paid_backends.is_empty() {
            return Err(SearchError::Config(
                "at least one backend must be enabled".into(),
            ));
        }
        if let Some(id) = self
            .free_backends
            .iter()
            .find(|id| id.kind() != BackendKind::Free)
        {
            return Err(SearchError::Config(format!(
                "{id} is a paid backend and cannot be listed in free_backends"
            )));
        }
        if let Some(id) = self
            .paid_backends
            .iter()
            .find(|id| id.kind() != BackendKind::Paid)
        {
            return Err(SearchError::Config(format!(
                "{id} is a free backend and cannot be listed in paid_backends"
            )));
        }
        if self.rate_limit_jitter_ms > self.rate_limit_base_ms {
            return Err(SearchError::Config(
                "rate_limit_jitter_ms must be <= rate_limit_base_ms".into(),
            ));
        }
        Ok(())
    }

    /// The retry policy described by this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            rate_limit_base: Duration::from_millis(self.rate_limit_base_ms),
            rate_limit_jitter: Duration::from_millis(self.rate_limit_jitter_ms),
        }
    }

    /// The chain-wide minimum interval between invocations.
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// API keys for the paid backends. Every field is optional; a backend whose
/// key is absent reports itself unavailable without making a request.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCredentials {
    /// Google Programmable Search Engine API key.
    pub google_pse_api_key: Option<String>,
    /// Google Programmable Search Engine id (`cx`).
    pub google_pse_engine_id: Option<String>,
    /// Exa API key.
    pub exa_api_key: Option<String>,
    /// You.com API key.
    pub you_api_key: Option<String>,
    /// Tavily API key.
    pub tavily_api_key: Option<String>,
}

impl std::fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("SearchCredentials")
            .field("google_pse_api_key", &mask(&self.google_pse_api_key))
            .field("google_pse_engine_id", &self.google_pse_engine_id)
            .field("exa_api_key", &mask(&self.exa_api_key))
            .field("you_api_key", &mask(&self.you_api_key))
            .field("tavily_api_key", &mask(&self.tavily_api_key))
            .finish()
    }
}

impl SearchCredentials {
    /// Read credentials from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup (secrets file, env, ...).
    /// Blank values count as absent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            google_pse_api_key: get("GOOGLE_PSE_API_KEY"),
            google_pse_engine_id: get("GOOGLE_PSE_ENGINE_ID"),
            exa_api_key: get("EXA_API_KEY"),
            you_api_key: get("YOU_API_KEY"),
            tavily_api_key: get("TAVILY_API_KEY"),
        }
    }

    /// Fill every absent or blank field from `other`.
    pub fn or(self, other: SearchCredentials) -> Self {
        Self {
            google_pse_api_key: non_blank(self.google_pse_api_key)
                .or_else(|| non_blank(other.google_pse_api_key)),
            google_pse_engine_id: non_blank(self.google_pse_engine_id)
                .or_else(|| non_blank(other.google_pse_engine_id)),
            exa_api_key: non_blank(self.exa_api_key).or_else(|| non_blank(other.exa_api_key)),
            you_api_key: non_blank(self.you_api_key).or_else(|| non_blank(other.you_api_key)),
            tavily_api_key: non_blank(self.tavily_api_key)
                .or_else(|| non_blank(other.tavily_api_key)),
        }
    }

    pub fn google_pse(&self) -> Option<(&str, &str)> {
        Some((
            present(&self.google_pse_api_key)?,
            present(&self.google_pse_engine_id)?,
        ))
    }

    pub fn exa(&self) -> Option<&str> {
        present(&self.exa_api_key)
    }

    pub fn you(&self) -> Option<&str> {
        present(&self.you_api_key)
    }

    pub fn tavily(&self) -> Option<&str> {
        present(&self.tavily_api_key)
    }
}

/// Blank keys (`tavily_api_key = ""` in a config file) count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// How a single backend is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay after a generic failure.
    pub retry_delay: Duration,
    /// Base of the exponential delay after a rate-limited failure.
    pub rate_limit_base: Duration,
    /// Maximum random jitter added to a rate-limit delay.
    pub rate_limit_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        SearchConfig::default().retry_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.retry_delay_ms, 1000);
        assert_eq!(config.min_interval_ms, 1000);
        assert_eq!(config.timeout_seconds, 10);
        assert_eq!(config.max_results, 5);
        assert!(config.user_agent.is_none());
    }

    #[test]
    fn default_lists_put_free_backends_first() {
        let config = SearchConfig::default();
        assert_eq!(config.free_backends.len(), 4);
        assert_eq!(config.free_backends[0], BackendId::DuckDuckGoLite);
        assert_eq!(config.paid_backends[0], BackendId::GooglePse);
        assert!(config
            .paid_backends
            .iter()
            .all(|b| b.kind() == BackendKind::Paid));
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_attempts_rejected() {
        let config = SearchConfig {
            max_attempts: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SearchConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn empty_backends_rejected() {
        let config = SearchConfig {
            free_backends: vec![],
            paid_backends: vec![],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn paid_backend_in_free_list_rejected() {
        let config = SearchConfig {
            free_backends: vec![BackendId::Exa],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("free_backends"));
    }

    #[test]
    fn jitter_larger_than_base_rejected() {
        let config = SearchConfig {
            rate_limit_base_ms: 100,
            rate_limit_jitter_ms: 500,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("jitter"));
    }

    #[test]
    fn retry_policy_mirrors_config() {
        let config = SearchConfig {
            max_attempts: 3,
            retry_delay_ms: 250,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn credentials_from_lookup_skip_blank_values() {
        let creds = SearchCredentials::from_lookup(|name| match name {
            "EXA_API_KEY" => Some("exa-123".into()),
            "TAVILY_API_KEY" => Some("   ".into()),
            _ => None,
        });
        assert_eq!(creds.exa_api_key.as_deref(), Some("exa-123"));
        assert!(creds.tavily_api_key.is_none());
        assert!(creds.google_pse_api_key.is_none());
    }

    #[test]
    fn credentials_or_prefers_self() {
        let file = SearchCredentials {
            exa_api_key: Some("from-file".into()),
            ..Default::default()
        };
        let env = SearchCredentials {
            exa_api_key: Some("from-env".into()),
            you_api_key: Some("you-env".into()),
            ..Default::default()
        };
        let merged = file.or(env);
        assert_eq!(merged.exa_api_key.as_deref(), Some("from-file"));
        assert_eq!(merged.you_api_key.as_deref(), Some("you-env"));
    }

    #[test]
    fn blank_file_key_does_not_hide_secret() {
        let file: SearchCredentials =
            serde_json::from_str(r#"{"tavily_api_key": "", "exa_api_key": "  "}"#)
                .expect("deserialize");
        assert!(file.tavily().is_none());
        assert!(file.exa().is_none());

        let secrets = SearchCredentials::from_lookup(|name| {
            (name == "TAVILY_API_KEY").then(|| "tvly-real".to_owned())
        });
        let merged = file.or(secrets);
        assert_eq!(merged.tavily(), Some("tvly-real"));
        assert!(merged.exa_api_key.is_none());
    }

    #[test]
    fn google_pse_needs_both_values() {
        let creds = SearchCredentials {
            google_pse_api_key: Some("key".into()),
            google_pse_engine_id: Some(" ".into()),
            ..Default::default()
        };
        assert!(creds.google_pse().is_none());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: SearchConfig =
            serde_json::from_str(r#"{"max_attempts": 4, "paid_backends": ["exa"]}"#)
                .expect("deserialize");
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.paid_backends, vec![BackendId::Exa]);
        assert_eq!(config.free_backends.len(), 4);
    }
}
