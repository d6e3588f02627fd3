//! Provider contract tests.
//!
//! Each provider choice is resolved from configuration and its client is
//! pointed at a wiremock server to check what actually goes over the wire.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use omnichat::llm::ProviderOverrides;
use omnichat::llm::openrouter::{OPENROUTER_REFERER, OPENROUTER_TITLE};
use omnichat::{ChatError, ChatMessage, LlmConfig, ProviderChoice, ProviderConfig, Secrets};
use omnichat::llm::collect_stream;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn llm_config(server: &MockServer) -> LlmConfig {
    LlmConfig {
        openai_base_url: format!("{}/v1", server.uri()),
        openrouter_base_url: format!("{}/api/v1", server.uri()),
        ..LlmConfig::default()
    }
}

fn completion(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    }))
}

#[tokio::test]
async fn openrouter_sends_attribution_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-or-file"))
        .and(header("HTTP-Referer", OPENROUTER_REFERER))
        .and(header("X-Title", OPENROUTER_TITLE))
        .and(body_partial_json(json!({"model": "meta-llama/llama-4-maverick:free"})))
        .respond_with(completion("hola desde OpenRouter"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProviderConfig::resolve(
        ProviderChoice::OpenRouter,
        &llm_config(&server),
        &Secrets::new().with("OPENROUTER_API_KEY", "sk-or-file"),
        &ProviderOverrides::default(),
    )
    .unwrap()
    .into_client(Duration::from_secs(5))
    .unwrap();

    assert_eq!(client.provider(), "OpenRouter");
    let reply = client.complete(&[ChatMessage::user("hola")]).await.unwrap();
    assert_eq!(reply, "hola desde OpenRouter");
}

#[tokio::test]
async fn openrouter_session_model_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"model": "qwen/qwen2.5-vl-72b-instruct:free"})))
        .respond_with(completion("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProviderConfig::resolve(
        ProviderChoice::OpenRouter,
        &llm_config(&server),
        &Secrets::new().with("OPENROUTER_API_KEY", "sk-or-file"),
        &ProviderOverrides {
            api_key: None,
            model: Some("qwen/qwen2.5-vl-72b-instruct:free".into()),
        },
    )
    .unwrap()
    .into_client(Duration::from_secs(5))
    .unwrap();

    client.complete(&[ChatMessage::user("x")]).await.unwrap();
}

#[tokio::test]
async fn openai_streams_with_temperature_zero() {
    let server = MockServer::start().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"Uno\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\", dos\"}}]}\n\n",
        "data: [DONE]\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-nano",
            "temperature": 0.0,
            "stream": true,
            "messages": [
                {"role": "system", "content": "Responde en español."},
                {"role": "user", "content": "Cuenta"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ProviderConfig::resolve(
        ProviderChoice::OpenAi,
        &llm_config(&server),
        &Secrets::new().with("OPENAI_API_KEY", "sk-server"),
        &ProviderOverrides::default(),
    )
    .unwrap()
    .into_client(Duration::from_secs(5))
    .unwrap();

    let rx = client
        .stream(&[ChatMessage::system("Responde en español."), ChatMessage::user("Cuenta")])
        .await
        .unwrap();
    assert_eq!(collect_stream(rx).await.unwrap(), "Uno, dos");
}

#[tokio::test]
async fn openrouter_rejected_key_points_to_openrouter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "No auth credentials found", "code": 401}
        })))
        .mount(&server)
        .await;

    let client = ProviderConfig::resolve(
        ProviderChoice::OpenRouter,
        &llm_config(&server),
        &Secrets::new().with("OPENROUTER_API_KEY", "sk-or-bad"),
        &ProviderOverrides::default(),
    )
    .unwrap()
    .into_client(Duration::from_secs(5))
    .unwrap();

    let err = client.complete(&[ChatMessage::user("x")]).await.unwrap_err();
    assert!(matches!(err, ChatError::Config { .. }));
    assert!(err.user_message().contains("https://openrouter.ai/keys"));
}

#[test]
fn missing_openrouter_key_names_where_to_get_one() {
    // Only meaningful when the environment does not carry a key.
    if std::env::var("OPENROUTER_API_KEY").is_ok_and(|k| !k.trim().is_empty()) {
        return;
    }
    let err = ProviderConfig::resolve(
        ProviderChoice::OpenRouter,
        &LlmConfig::default(),
        &Secrets::new(),
        &ProviderOverrides::default(),
    )
    .unwrap_err();
    let message = err.user_message();
    assert!(message.contains("Por favor, añade tu clave API de OpenRouter para continuar."));
    assert!(message.contains("Obtén tu clave en: https://openrouter.ai/keys"));
}
