//! Core types: results, backend identification, and chain outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single search result produced by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// The title of the result page.
    pub title: String,
    /// A text snippet summarising the page content.
    pub snippet: String,
    /// The URL of the result.
    pub url: String,
    /// Name of the backend that produced this result.
    pub source_backend: String,
}

impl SearchResult {
    /// Create a result tagged with the backend that produced it.
    pub fn new(
        title: impl Into<String>,
        snippet: impl Into<String>,
        url: impl Into<String>,
        source_backend: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            url: url.into(),
            source_backend: source_backend.into(),
        }
    }
}

/// Cost tier of a backend. Free backends are always tried before paid ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Scraping targets and keyless endpoints.
    Free,
    /// Vendor APIs that need a key and may bill per request.
    Paid,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::Paid => f.write_str("paid"),
        }
    }
}

/// The built-in backends that can be named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendId {
    /// DuckDuckGo lite endpoint. Answers with a 202 when throttling.
    #[serde(rename = "duckduckgo_lite")]
    DuckDuckGoLite,
    /// DuckDuckGo HTML-only results page.
    #[serde(rename = "duckduckgo_html")]
    DuckDuckGoHtml,
    /// Google results page scraping.
    GoogleScrape,
    /// Bing results page scraping.
    BingScrape,
    /// Google Programmable Search Engine JSON API.
    GooglePse,
    /// Exa search API.
    Exa,
    /// You.com search API.
    You,
    /// Tavily search API.
    Tavily,
}

impl BackendId {
    /// Returns the human-readable name used in logs and result tags.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DuckDuckGoLite => "DuckDuckGo Search",
            Self::DuckDuckGoHtml => "DuckDuckGo HTML",
            Self::GoogleScrape => "Google Scraping",
            Self::BingScrape => "Bing Scraping",
            Self::GooglePse => "Google Search",
            Self::Exa => "Exa Search",
            Self::You => "You.com Search",
            Self::Tavily => "Tavily Search",
        }
    }

    /// Returns the cost tier of this backend.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::DuckDuckGoLite | Self::DuckDuckGoHtml | Self::GoogleScrape | Self::BingScrape => {
                BackendKind::Free
            }
            Self::GooglePse | Self::Exa | Self::You | Self::Tavily => BackendKind::Paid,
        }
    }

    /// Returns every backend variant, free ones first.
    pub fn all() -> &'static [BackendId] {
        &[
            Self::DuckDuckGoLite,
            Self::DuckDuckGoHtml,
            Self::GoogleScrape,
            Self::BingScrape,
            Self::GooglePse,
            Self::Exa,
            Self::You,
            Self::Tavily,
        ]
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Terminal value of one chain invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A backend returned a non-empty result list.
    Success {
        /// Results, each tagged with `backend_name`.
        results: Vec<SearchResult>,
        /// The backend that answered.
        backend_name: String,
    },
    /// Every backend failed or came back empty.
    Failure {
        /// One entry per failed attempt, for logs only.
        errors: Vec<String>,
    },
}

impl SearchOutcome {
    /// Whether a backend produced results.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The results on success, an empty slice otherwise.
    pub fn results(&self) -> &[SearchResult] {
        match self {
            Self::Success { results, .. } => results,
            Self::Failure { .. } => &[],
        }
    }
}
