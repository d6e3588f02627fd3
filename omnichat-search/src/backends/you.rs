//! You.com search API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::read_body;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://api.ydc-index.io/search";

#[derive(Debug, Deserialize)]
struct YouResponse {
    #[serde(default)]
    snippets: Vec<YouSnippet>,
}

#[derive(Debug, Deserialize)]
struct YouSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

/// You.com search backend.
pub struct YouBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl YouBackend {
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
impl SearchBackend for YouBackend {
    fn name(&self) -> &str {
        BackendId::You.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Paid
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.config.credentials.you() else {
            tracing::warn!(backend = self.name(), "credentials missing");
            return Err(SearchError::MissingCredential("YOU_API_KEY".into()));
        };

        tracing::trace!(query, "You.com search");

        let client = http::build_client(&self.config)?;
        let response = client
            .get(&self.endpoint)
            .header("X-API-Key", api_key)
            .query(&[("query", query)])
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("You.com request failed: {e}")))?;

        let body = read_body(self.name(), response).await?;
        let parsed: YouResponse = serde_json::from_str(&body)
            .map_err(|e| SearchError::Parse(format!("You.com response: {e}")))?;

        Ok(parsed
            .snippets
            .into_iter()
            .take(self.config.max_results)
            .map(|s| SearchResult::new(s.title, s.content, s.url, self.name()))
            .collect())
    }
}
