//! Tavily search API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::read_body;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://api.tavily.com/search";

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyItem>,
}

#[derive(Debug, Deserialize)]
struct TavilyItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

/// Tavily search backend. Uses the cheap `basic` search depth.
pub struct TavilyBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl TavilyBackend {
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
impl SearchBackend for TavilyBackend {
    fn name(&self) -> &str {
        BackendId::Tavily.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Paid
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.config.credentials.tavily() else {
            tracing::warn!(backend = self.name(), "credentials missing");
            return Err(SearchError::MissingCredential("TAVILY_API_KEY".into()));
        };

        tracing::trace!(query, "Tavily search");

        let body = serde_json::json!({
            "query": query,
            "search_depth": "basic",
            "max_results": self.config.max_results,
        });

        let client = http::build_client(&self.config)?;
        let response = client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Tavily request failed: {e}")))?;

        let text = read_body(self.name(), response).await?;
        let parsed: TavilyResponse = serde_json::from_str(&text)
            .map_err(|e| SearchError::Parse(format!("Tavily response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(self.config.max_results)
            .map(|item| SearchResult::new(item.title, item.content, item.url, self.name()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchCredentials;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_key() -> Arc<SearchConfig> {
        Arc::new(SearchConfig {
            credentials: SearchCredentials {
                tavily_api_key: Some("tvly-key".into()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let backend = TavilyBackend::new(Arc::new(SearchConfig::default()));
        let err = backend.search("hola").await.unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }

    #[tokio::test]
    async fn basic_depth_request_parses_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "query": "elecciones",
                "search_depth": "basic",
                "max_results": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "title": "Registraduría",
                    "url": "https://www.registraduria.gov.co/",
                    "content": "Calendario electoral"
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = TavilyBackend::new(config_with_key()).with_endpoint(server.uri());
        let results = backend.search("elecciones").await.expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].snippet, "Calendario electoral");
        assert_eq!(results[0].source_backend, "Tavily Search");
    }

    #[tokio::test]
    async fn blank_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(0)
            .mount(&server)
            .await;

        let config: SearchConfig =
            serde_json::from_value(json!({"credentials": {"tavily_api_key": ""}})).unwrap();
        let backend = TavilyBackend::new(Arc::new(config)).with_endpoint(server.uri());
        let err = backend.search("x").await.unwrap_err();
        assert!(matches!(err, SearchError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn rejected_key_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let backend = TavilyBackend::new(config_with_key()).with_endpoint(server.uri());
        let err = backend.search("x").await.unwrap_err();
        assert!(matches!(err, SearchError::Unauthorized(_)));
        assert!(!err.is_retryable());
    }
}
