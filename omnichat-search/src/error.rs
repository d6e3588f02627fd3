//! Error types for the omnichat-search crate.
//!
//! Messages are stable and never contain API keys. They are meant for logs
//! and diagnostics; the chat transcript only ever sees formatted results or
//! the last-resort answer.

/// Errors that can occur while querying search backends.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A backend needs a credential that is not configured.
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// The backend refused the configured credential (HTTP 401/403).
    #[error("credential rejected: {0}")]
    Unauthorized(String),

    /// An HTTP request to a backend failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered, but the response could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The backend is throttling us.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Every backend in the chain failed.
    #[error("all search backends failed: {0}")]
    ChainExhausted(String),
}

impl SearchError {
    /// Whether this error should trigger exponential backoff instead of the
    /// fixed retry delay.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }

    /// Whether retrying the same backend can help.
    ///
    /// A missing or rejected credential stays that way on the next attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::MissingCredential(_) | Self::Unauthorized(_) | Self::Config(_)
        )
    }

    /// Map a non-success HTTP status from `backend` to an error.
    pub(crate) fn from_status(backend: &str, status: reqwest::StatusCode) -> Self {
        match status {
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                Self::RateLimited(format!("{backend} returned {status}"))
            }
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Self::Unauthorized(format!("{backend} returned {status}"))
            }
            _ => Self::Http(format!("{backend} returned {status}")),
        }
    }
}

/// Convenience type alias for omnichat-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_missing_credential() {
        let err = SearchError::MissingCredential("EXA_API_KEY".into());
        assert_eq!(err.to_string(), "missing credential: EXA_API_KEY");
    }

    #[test]
    fn display_rate_limited() {
        let err = SearchError::RateLimited("DuckDuckGo returned 202".into());
        assert_eq!(err.to_string(), "rate limited: DuckDuckGo returned 202");
    }

    #[test]
    fn display_chain_exhausted() {
        let err = SearchError::ChainExhausted("bing: timeout".into());
        assert_eq!(err.to_string(), "all search backends failed: bing: timeout");
    }

    #[test]
    fn rate_limit_classification() {
        assert!(SearchError::RateLimited("x".into()).is_rate_limited());
        assert!(!SearchError::Http("x".into()).is_rate_limited());
        assert!(!SearchError::Parse("x".into()).is_rate_limited());
    }

    #[test]
    fn missing_credential_is_not_retryable() {
        assert!(!SearchError::MissingCredential("k".into()).is_retryable());
        assert!(SearchError::Http("x".into()).is_retryable());
        assert!(SearchError::RateLimited("x".into()).is_retryable());
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let err = SearchError::from_status("Tavily", reqwest::StatusCode::TOO_MANY_REQUESTS);
        assert!(err.is_rate_limited());
        let err = SearchError::from_status("Tavily", reqwest::StatusCode::BAD_GATEWAY);
        assert!(matches!(err, SearchError::Http(_)));
    }

    #[test]
    fn rejected_key_is_not_retried() {
        for status in [reqwest::StatusCode::UNAUTHORIZED, reqwest::StatusCode::FORBIDDEN] {
            let err = SearchError::from_status("Exa", status);
            assert!(matches!(err, SearchError::Unauthorized(_)));
            assert!(!err.is_retryable());
            assert!(!err.is_rate_limited());
        }
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
