//! Exa search API.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::read_body;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::http;
use crate::types::{BackendId, BackendKind, SearchResult};

const ENDPOINT: &str = "https://api.exa.ai/search";

/// Characters of page text requested per result; used as the snippet.
const MAX_TEXT_CHARACTERS: u32 = 1000;

#[derive(Debug, Deserialize)]
struct ExaResponse {
    #[serde(default)]
    results: Vec<ExaItem>,
}

#[derive(Debug, Deserialize)]
struct ExaItem {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    text: Option<String>,
}

/// Exa neural search backend.
pub struct ExaBackend {
    config: Arc<SearchConfig>,
    endpoint: String,
}

impl ExaBackend {
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
impl SearchBackend for ExaBackend {
    fn name(&self) -> &str {
        BackendId::Exa.name()
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Paid
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        let Some(api_key) = self.config.credentials.exa() else {
            tracing::warn!(backend = self.name(), "credentials missing");
            return Err(SearchError::MissingCredential("EXA_API_KEY".into()));
        };

        tracing::trace!(query, "Exa search");

        let body = serde_json::json!({
            "query": query,
            "numResults": self.config.max_results,
            "contents": { "text": { "maxCharacters": MAX_TEXT_CHARACTERS } },
        });

        let client = http::build_client(&self.config)?;
        let response = client
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Http(format!("Exa request failed: {e}")))?;

        let text = read_body(self.name(), response).await?;
        let parsed: ExaResponse = serde_json::from_str(&text)
            .map_err(|e| SearchError::Parse(format!("Exa response: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(self.config.max_results)
            .map(|item| {
                SearchResult::new(
                    item.title.unwrap_or_default(),
                    item.text.unwrap_or_default(),
                    item.url,
                    self.name(),
                )
            })
            .collect())
    }
}
