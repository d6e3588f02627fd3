//! Client for any server that speaks the OpenAI chat completions API.
//!
//! OpenAI itself, OpenRouter and user-supplied keys all go through this one
//! client; they differ only in base URL, key, model and extra headers.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::client::LlmClient;
use super::sse::{SseDecoder, SseFrame, parse_chunk};
use crate::error::{ChatError, Result};
use crate::session::ChatMessage;

const STREAM_BUFFER: usize = 64;

/// Connection details for one OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    provider: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    headers: Vec<(String, String)>,
    remediation: Option<String>,
}

impl fmt::Debug for OpenAiCompatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatClient")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatClient {
    /// `base_url` includes the version segment, e.g. `https://api.openai.com/v1`.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Llm`] if the HTTP client cannot be built.
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Llm(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
            headers: Vec::new(),
            remediation: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send an extra header with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Text shown to the user when the key is rejected.
    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn body(&self, messages: &[ChatMessage], stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": stream,
        })
    }

    async fn send(&self, messages: &[ChatMessage], stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.body(messages, stream));
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        tracing::debug!(
            provider = %self.provider,
            model = %self.model,
            messages = messages.len(),
            stream,
            "chat completion request"
        );

        let response = request
            .send()
            .await
            .map_err(|e| ChatError::Llm(format!("{} request failed: {e}", self.provider)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_http_error(status, &body));
        }
        Ok(response)
    }

    fn map_http_error(&self, status: StatusCode, body: &str) -> ChatError {
        let message = extract_error_message(body);
        tracing::warn!(
            provider = %self.provider,
            status = status.as_u16(),
            %message,
            "chat completion failed"
        );
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Config {
                message: format!("La clave API de {} no es válida.", self.provider),
                remediation: self.remediation.clone(),
            },
            _ => ChatError::Llm(format!("{} HTTP {}: {message}", self.provider, status.as_u16())),
        }
    }
}

fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_owned))
        .unwrap_or_else(|| body.trim().to_owned())
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.send(messages, false).await?;
        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Llm(format!("invalid {} response: {e}", self.provider)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ChatError::Llm(format!("{} returned no choices", self.provider)))
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<mpsc::Receiver<Result<String>>> {
        let response = self.send(messages, true).await?;
        let provider = self.provider.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                let frames = match chunk {
                    Ok(chunk) => decoder.push(&chunk),
                    Err(e) => {
                        let _ = tx
                            .send(Err(ChatError::Llm(format!("{provider} stream read error: {e}"))))
                            .await;
                        return;
                    }
                };
                for frame in frames {
                    if !forward(&tx, &provider, frame).await {
                        return;
                    }
                }
            }
            if let Some(frame) = decoder.finish() {
                forward(&tx, &provider, frame).await;
            }
        });

        Ok(rx)
    }
}

/// Push one frame's delta to the receiver. Returns `false` when streaming
/// should stop.
async fn forward(tx: &mpsc::Sender<Result<String>>, provider: &str, frame: SseFrame) -> bool {
    let payload = match frame {
        SseFrame::Done => return false,
        SseFrame::Data(payload) => payload,
    };
    match parse_chunk(&payload) {
        Ok(delta) => match delta.content {
            Some(text) => tx.send(Ok(text)).await.is_ok(),
            None => true,
        },
        Err(message) => {
            let _ = tx
                .send(Err(ChatError::Llm(format!("{provider} stream error: {message}"))))
                .await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::llm::client::collect_stream;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            "OpenAI",
            format!("{}/v1", server.uri()),
            "sk-test",
            "gpt-4.1-nano",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4.1-nano",
                "stream": false,
                "messages": [{"role": "user", "content": "hola"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "¡Hola!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server).complete(&[ChatMessage::user("hola")]).await.unwrap();
        assert_eq!(reply, "¡Hola!");
    }

    #[tokio::test]
    async fn extra_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("X-Title", "OmniChat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "ok"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client(&server)
            .with_header("X-Title", "OmniChat")
            .complete(&[ChatMessage::user("x")])
            .await
            .unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_config_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .with_remediation(
                "Obtén tu clave de este enlace: https://platform.openai.com/account/api-keys",
            )
            .complete(&[ChatMessage::user("x")])
            .await
            .unwrap_err();
        match err {
            ChatError::Config { remediation, .. } => {
                assert!(remediation.unwrap().contains("platform.openai.com"));
            }
            other => panic!("expected Config, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_llm_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).complete(&[ChatMessage::user("x")]).await.unwrap_err();
        match err {
            ChatError::Llm(msg) => assert!(msg.contains("503") && msg.contains("overloaded")),
            other => panic!("expected Llm, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        assert!(client(&server).complete(&[ChatMessage::user("x")]).await.is_err());
    }

    #[tokio::test]
    async fn stream_yields_deltas_until_done() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hola\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" mundo\"},\"finish_reason\":\"stop\"}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n\n",
        );
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({"stream": true})))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client(&server).stream(&[ChatMessage::user("hola")]).await.unwrap();
        assert_eq!(collect_stream(rx).await.unwrap(), "Hola mundo");
    }

    #[tokio::test]
    async fn stream_error_chunk_is_forwarded() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Ho\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"Provider returned error\"}}\n\n",
        );
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client(&server).stream(&[ChatMessage::user("x")]).await.unwrap();
        let err = collect_stream(rx).await.unwrap_err();
        assert!(err.to_string().contains("Provider returned error"));
    }

    #[tokio::test]
    async fn stream_rejects_bad_key_before_first_delta() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client(&server).stream(&[ChatMessage::user("x")]).await;
        assert!(matches!(result, Err(ChatError::Config { .. })));
    }

    #[test]
    fn debug_omits_api_key() {
        let client = OpenAiCompatClient::new(
            "OpenAI",
            "https://api.openai.com/v1/",
            "sk-hidden",
            "gpt-4o-mini",
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(!format!("{client:?}").contains("sk-hidden"));
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
    }
}
