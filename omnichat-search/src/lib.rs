//! # omnichat-search
//!
//! Web search with a priority fallback chain for OmniChat.
//!
//! ## Design
//!
//! - Free backends (DuckDuckGo, Google and Bing scraping) are always tried
//!   before paid APIs (Google Programmable Search, Exa, You.com, Tavily)
//! - Each backend is retried with a fixed delay, or exponential backoff with
//!   jitter when it reports rate limiting
//! - The first backend with results wins; later backends are never called
//! - A minimum interval between chain invocations keeps upstreams calm
//! - When everything fails, a keyword-based [`FallbackPolicy`] still answers
//!
//! ## Security
//!
//! - API keys are read from config or environment and never logged
//! - Search queries are logged only at trace level

pub mod backend;
pub mod backends;
pub mod chain;
pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod format;
pub mod http;
pub mod registry;
pub mod retry;
pub mod types;

pub use backend::{BackendDescriptor, SearchBackend};
pub use chain::SearchChain;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RetryPolicy, SearchConfig, SearchCredentials};
pub use error::{Result, SearchError};
pub use fallback::{FallbackPolicy, FallbackRule, KeywordFallback};
pub use format::format_results;
pub use retry::{with_retry, AttemptFailure, RetryExhausted};
pub use types::{BackendId, BackendKind, SearchOutcome, SearchResult};

/// Search once with a chain built from `config`, returning rendered results
/// or the fallback answer.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid. Backend failures
/// never surface here.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> omnichat_search::Result<()> {
/// let config = omnichat_search::SearchConfig::default();
/// let text = omnichat_search::search_answer("tasa de cambio hoy", &config).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub async fn search_answer(query: &str, config: &SearchConfig) -> Result<String> {
    let mut chain = SearchChain::from_config(config)?;
    Ok(chain.answer(query).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_answer_validates_config_zero_max_results() {
        let config = SearchConfig {
            max_results: 0,
            ..Default::default()
        };
        let result = search_answer("test", &config).await;
        assert!(result.unwrap_err().to_string().contains("max_results"));
    }

    #[tokio::test]
    async fn search_answer_validates_config_empty_backends() {
        let config = SearchConfig {
            free_backends: vec![],
            paid_backends: vec![],
            ..Default::default()
        };
        let result = search_answer("test", &config).await;
        assert!(result.unwrap_err().to_string().contains("backend"));
    }
}
