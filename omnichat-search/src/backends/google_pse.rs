//! Google Programmable Search Engine (Custom Search JSON API).
//!
//! Needs both an API key and an engine id (`cx`). Without either, the
//! backend reports [`SearchError::MissingCredential`] and makes no request.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::read_body;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Custom Search JSON API response. `items` is absent when nothing matched.
#[derive(Debug, Deserialize)]
struct PseResponse {
    #[serde(default)]
    items: Vec<PseItem>,
}

#[derive(Debug, Deserialize)]
struct PseItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Programmable Search Engine backend.
pub struct GooglePseBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl GooglePseBackend {
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
impl SearchBackend for GooglePseBackend {
    fn name(&self) -> &str {
        BackendId::GooglePse.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Paid
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let Some((api_key, engine_id)) = self.config.credentials.google_pse() else {
            tracing::warn!(backend = self.name(), "credentials missing");
            return Err(SearchError::MissingCredential(
                "GOOGLE_PSE_API_KEY and GOOGLE_PSE_ENGINE_ID".into(),
            ));
        };

        tracing::trace!(query, "Google PSE search");

        // The API caps `num` at 10.
        let num = self.config.max_results.min(10).to_string();
        let client = http::build_client(&self.config)?;
        let response = client
            .get(&self.endpoint)
            .query(&[
                ("key", api_key),
                ("cx", engine_id),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Google PSE request failed: {e}")))?;

        let body = read_body(self.name(), response).await?;
        let parsed: PseResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::Parse(format!("Google PSE response: {e}")))?;

        if parsed.items.is_empty() {
            tracing::debug!("Google PSE returned no items");
        }

        Ok(parsed
            .items
            .into_iter()
            .take(self.config.max_results)
            .map(|item| SearchResult::new(item.title, item.snippet, item.link, self.name()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchCredentials;
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_with_keys() -> Arc<SearchConfig> {
        Arc::new(SearchConfig {
            credentials: SearchCredentials {
                google_pse_api_key: Some("pse-key".into()),
                google_pse_engine_id: Some("engine-1".into()),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn missing_credentials_skip_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let backend = GooglePseBackend::new(Arc::new(SearchConfig::default()))
            .with_endpoint(server.uri());
        let err = backend.search("hola").await.unwrap_err();
        assert!(matches!(err, SearchError::MissingCredential(_)));
    }

    #[tokio::test]
    async fn parses_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("key", "pse-key"))
            .and(query_param("cx", "engine-1"))
            .and(query_param("q", "clima bogotá"))
            .and(query_param("num", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"title": "IDEAM", "link": "https://www.ideam.gov.co/", "snippet": "Pronóstico"},
                    {"title": "El Tiempo", "link": "https://www.eltiempo.com/", "snippet": "Clima"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = GooglePseBackend::new(config_with_keys()).with_endpoint(server.uri());
        let results = backend.search("clima bogotá").await.expect("search");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "IDEAM");
        assert_eq!(results[0].url, "https://www.ideam.gov.co/");
        assert_eq!(results[1].source_backend, "Google Search");
    }

    #[tokio::test]
    async fn absent_items_means_no_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"kind": "customsearch#search"})),
            )
            .mount(&server)
            .await;

        let backend = GooglePseBackend::new(config_with_keys()).with_endpoint(server.uri());
        let results = backend.search("nada").await.expect("search");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn quota_exceeded_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let backend = GooglePseBackend::new(config_with_keys()).with_endpoint(server.uri());
        assert!(backend.search("x").await.unwrap_err().is_rate_limited());
    }
}
