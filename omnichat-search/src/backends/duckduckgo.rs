//! DuckDuckGo backends: the lite endpoint and the HTML-only results page.
//!
//! Both endpoints need no JavaScript and no key. DuckDuckGo signals
//! throttling with a `202 Accepted` carrying an empty page, or with an
//! "anomaly" challenge page; both are reported as
//! [`SearchError::RateLimited`] so the retry wrapper backs off exponentially.

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

const LITE_ENDPOINT: &str = "https://lite.duckduckgo.com/lite/";
const HTML_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Marker present on DuckDuckGo's bot challenge page.
const ANOMALY_MARKER: &str = "anomaly-modal";

/// DuckDuckGo lite endpoint. First free backend in the default chain.
pub struct DuckDuckGoLiteBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl DuckDuckGoLiteBackend {
    /// Create the backend with the public endpoint.
    pub fn new(config: Arc<SearchConfig>) -> Self {
        Self {
            config,
            endpoint: LITE_ENDPOINT.to_owned(),
        }
    }

    /// Point the backend at another endpoint (mock servers in tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoLiteBackend {
    fn name(&self) -> &str {
        BackendId::DuckDuckGoLite.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Free
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "DuckDuckGo lite search");
        let html = post_form(self.name(), &self.endpoint, query, &self.config).await?;
        parse_duckduckgo_lite(&html, self.config.max_results)
    }
}

/// DuckDuckGo HTML-only results page.
pub struct DuckDuckGoHtmlBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl DuckDuckGoHtmlBackend {
    /// Create the backend with the public endpoint.
    pub fn new(config: Arc<SearchConfig>) -> Self {
        Self {
            config,
            endpoint: HTML_ENDPOINT.to_owned(),
        }
    }

    /// Point the backend at another endpoint (mock servers in tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl SearchBackend for DuckDuckGoHtmlBackend {
    fn name(&self) -> &str {
        BackendId::DuckDuckGoHtml.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Free
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "DuckDuckGo HTML search");
        let html = post_form(self.name(), &self.endpoint, query, &self.config).await?;
        parse_duckduckgo_html(&html, self.config.max_results)
    }
}

/// POST the query form and return the page, classifying throttling answers.
async fn post_form(
    backend: &str,
    endpoint: &str,
    query: &str,
    config: &SearchConfig,
) -> Result<String, SearchError> {
    let client = http::build_client(config)?;
    let region = format!("{}-{}", config.language, config.language);

    let response = client
        .post(endpoint)
        .form(&[("q", query), ("kl", region.as_str())])
        .send()
        .await
        .map_err(|e| SearchError::Http(format!("{backend} request failed: {e}")))?;

    if response.status() == reqwest::StatusCode::ACCEPTED {
        return Err(SearchError::RateLimited(format!(
            "{backend} answered 202 Accepted"
        )));
    }

    let html = read_body(backend, response).await?;
    tracing::trace!(bytes = html.len(), backend, "DuckDuckGo response received");

    if html.contains(ANOMALY_MARKER) {
        return Err(SearchError::RateLimited(format!(
            "{backend} served a bot challenge"
        )));
    }
    Ok(html)
}

/// Extract the actual URL from DuckDuckGo's redirect wrapper.
///
/// DDG wraps URLs like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`;
/// the target is the URL-decoded `uddg` parameter.
fn extract_url(href: &str) -> Option<String> {
    let full_href = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&full_href).ok()?;

    if parsed.host_str() == Some("duckduckgo.com") && parsed.path().starts_with("/l/") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned())
    } else {
        Some(full_href)
    }
}

fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css}: {e:?}")))
}

/// Parse the HTML-only results page.
pub(crate) fn parse_duckduckgo_html(
    html: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    let result_sel =
        selector(".result.results_links:not(.result--ad), .web-result:not(.result--ad)")?;
    let title_sel = selector(".result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut results = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = clean_text(&title_el.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let Some(url) = title_el.value().attr("href").and_then(extract_url) else {
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
            BackendId::DuckDuckGoHtml.name(),
        ));

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "DuckDuckGo HTML results parsed");
    Ok(results)
}

/// Parse the lite results page.
///
/// The lite page is a table: each result has a row with `a.result-link`
/// followed by a row with `td.result-snippet`, so links and snippets pair
/// up by position.
pub(crate) fn parse_duckduckgo_lite(
    html: &str,
    max_results: usize,
) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    let link_sel = selector("a.result-link")?;
    let snippet_sel = selector("td.result-snippet")?;

    let snippets: Vec<String> = document
        .select(&snippet_sel)
        .map(|el| clean_text(&el.text().collect::<String>()))
        .collect();

    let mut results = Vec::new();

    for (index, link) in document.select(&link_sel).enumerate() {
        let title = clean_text(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }
        let Some(url) = link.value().attr("href").and_then(extract_url) else {
            continue;
        };
        let snippet = snippets.get(index).cloned().unwrap_or_default();

        results.push(SearchResult::new(
            title,
            snippet,
            url,
            BackendId::DuckDuckGoLite.name(),
        ));

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "DuckDuckGo lite results parsed");
    Ok(results)
}
