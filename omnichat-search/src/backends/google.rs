//! Google results page scraping.
//!
//! Google has the best results but the most aggressive bot detection:
//! blocked clients are redirected to a `/sorry/` CAPTCHA page, which is
//! reported as a rate limit.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use url::Url;

use super::{clean_text, read_body};
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://www.google.com/search";

/// Google HTML results page scraper.
pub struct GoogleScrapeBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl GoogleScrapeBackend {
    /// Create the backend with the public endpoint.
    pub fn new(config: Arc<SearchConfig>) -> Self {
        Self {
            config,
            endpoint: ENDPOINT.to_owned(),
        }
    }

    /// Point the backend at another endpoint (mock servers in tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for GoogleScrapeBackend {
    fn name(&self) -> &str {
        BackendId::GoogleScrape.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Free
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "Google scraping search");

        let client = http::build_client(&self.config)?;
        let num = self.config.max_results.to_string();

        let response = client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("hl", self.config.language.as_str()),
                ("num", num.as_str()),
            ])
            .header("Referer", "https://www.google.com/")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google request failed: {e}")))?;

        if response.url().path().starts_with("/sorry/") {
            return Err(SearchError::RateLimited(
                "Google redirected to its CAPTCHA page".into(),
            ));
        }

        let html = read_body(self.name(), response).await?;
        tracing::trace!(bytes = html.len(), "Google response received");

        parse_google_html(&html, self.config.max_results)
    }
}

/// Unwrap `/url?q=<target>&sa=...` redirect links.
fn extract_url(href: &str) -> Option<String> {
    if href.starts_with("/url?") {
        let parsed = Url::parse(&format!("https://www.google.com{href}")).ok()?;
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "q" || key == "url")
            .map(|(_, value)| value.into_owned());
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_owned());
    }
    None
}

/// Parse a Google results page.
fn parse_google_html(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse("div.g")
        .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse("h3")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let link_sel = Selector::parse("a[href]")
        .map_err(|e| SearchError::Parse(format!("invalid link selector: {e:?}")))?;
    let snippet_sel = Selector::parse("div.VwiC3b, span.aCOpRe")
        .map_err(|e| SearchError::Parse(format!("invalid snippet selector: {e:?}")))?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };
        let title = clean_text(&title_el.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let Some(url) = element
            .select(&link_sel)
            .filter_map(|a| a.value().attr("href"))
            .find_map(extract_url)
        else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(|el| clean_text(&el.text().collect::<String>()))
            .unwrap_or_default();

        results.push(SearchResult::new(
            title,
            snippet,
            url,
            BackendId::GoogleScrape.name(),
        ));

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "Google results parsed");
    Ok(results)
}
