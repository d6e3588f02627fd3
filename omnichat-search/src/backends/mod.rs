//! Search backend implementations.
//!
//! Each module provides a struct implementing [`crate::backend::SearchBackend`].
//! Free backends scrape HTML results pages; paid backends call vendor JSON APIs
//! and need a key from [`crate::config::SearchCredentials`].

pub mod bing;
pub mod duckduckgo;
pub mod exa;
pub mod google;
pub mod google_pse;
pub mod tavily;
pub mod you;

pub use bing::BingScrapeBackend;
pub use duckduckgo::{DuckDuckGoHtmlBackend, DuckDuckGoLiteBackend};
pub use exa::ExaBackend;
pub use google::GoogleScrapeBackend;
pub use google_pse::GooglePseBackend;
pub use tavily::TavilyBackend;
pub use you::YouBackend;

use crate::error::SearchError;

/// Read a response body, turning throttling and error statuses into errors.
pub(crate) async fn read_body(
    backend: &str,
    response: reqwest::Response,
) -> Result<String, SearchError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::from_status(backend, status));
    }
    response
        .text()
        .await
        .map_err(|e| SearchError::Http(format!("{backend} response read failed: {e}")))
}

/// Collapse runs of whitespace in text extracted from HTML.
pub(crate) fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  Rust \n   Programming\tLanguage "), "Rust Programming Language");
        assert_eq!(clean_text(""), "");
    }
}
