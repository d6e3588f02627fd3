//! Bing results page scraping. Last free backend in the default chain.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};

use super::{clean_text, read_body};
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://www.bing.com/search";

/// Bing HTML results page scraper.
pub struct BingScrapeBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl BingScrapeBackend {
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
impl SearchBackend for BingScrapeBackend {
    fn name(&self) -> &str {
        BackendId::BingScrape.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Free
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "Bing scraping search");

        let client = http::build_client(&self.config)?;

        let response = client
            .get(&self.endpoint)
            .query(&[("q", query), ("setlang", self.config.language.as_str())])
            .header("Referer", "https://www.bing.com/")
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Bing request failed: {e}")))?;

        let html = read_body(self.name(), response).await?;
        tracing::trace!(bytes = html.len(), "Bing response received");

        parse_bing_html(&html, self.config.max_results)
    }
}

/// Parse a Bing results page.
fn parse_bing_html(html: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
    let document = Html::parse_document(html);

    // Organic results live in li.b_algo containers
    let result_sel = Selector::parse("li.b_algo")
        .map_err(|e| SearchError::Parse(format!("invalid result selector: {e:?}")))?;
    let title_sel = Selector::parse("h2")
        .map_err(|e| SearchError::Parse(format!("invalid title selector: {e:?}")))?;
    let link_sel = Selector::parse("a")
        .map_err(|e| SearchError::Parse(format!("invalid link selector: {e:?}")))?;
    let snippet_sel = Selector::parse(".b_caption p, .b_lineclamp2")
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

        let url = title_el
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(|h| h.to_string());

        let url = match url {
            Some(u) if !u.is_empty() => u,
            _ => continue,
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
            BackendId::BingScrape.name(),
        ));

        if results.len() >= max_results {
            break;
        }
    }

    tracing::debug!(count = results.len(), "Bing results parsed");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_BING_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<ol id="b_results">
<li class="b_algo">
  <h2><a href="https://www.banrep.gov.co/" h="ID=SERP">Banco de la República</a></h2>
  <div class="b_caption"><p>Tasa representativa del mercado y estadísticas.</p></div>
</li>
<li class="b_algo">
  <h2><a href="https://www.dane.gov.co/" h="ID=SERP">DANE</a></h2>
  <div class="b_caption"><p>Departamento Administrativo Nacional de Estadística.</p></div>
</li>
<li class="b_algo">
  <h2></h2>
</li>
</ol>
</body>
</html>"#;

    #[test]
    fn parse_mock_html_returns_results() {
        let results = parse_bing_html(MOCK_BING_HTML, 10).expect("should parse");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Banco de la República");
        assert_eq!(results[0].url, "https://www.banrep.gov.co/");
        assert!(results[0].snippet.contains("Tasa representativa"));
        assert_eq!(results[0].source_backend, "Bing Scraping");
    }

    #[test]
    fn parse_respects_max_results() {
        let results = parse_bing_html(MOCK_BING_HTML, 1).expect("should parse");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn parse_empty_html_returns_empty() {
        let results = parse_bing_html("<html><body></body></html>", 10).expect("should parse");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn sends_language_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "dólar hoy"))
            .and(query_param("setlang", "es"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_BING_HTML))
            .expect(1)
            .mount(&server)
            .await;

        let config = Arc::new(SearchConfig {
            user_agent: Some("TestBot/1.0".into()),
            ..Default::default()
        });
        let backend = BingScrapeBackend::new(config).with_endpoint(server.uri());
        let results = backend.search("dólar hoy").await.expect("search");
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn too_many_requests_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backend = BingScrapeBackend::new(Arc::new(SearchConfig::default()))
            .with_endpoint(server.uri());
        let err = backend.search("x").await.unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    #[ignore] // Live test: run with `cargo test -- --ignored`
    async fn live_bing_search() {
        let backend = BingScrapeBackend::new(Arc::new(SearchConfig::default()));
        let results = backend.search("rust programming").await.expect("live search");
        assert!(!results.is_empty());
    }
}
