//! The capability every chat page talks to.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::session::ChatMessage;

/// A chat-completion backend.
///
/// Implementations are resolved once from configuration (see
/// [`ProviderConfig::into_client`](super::provider::ProviderConfig::into_client))
/// and shared behind an `Arc`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider label for logs.
    fn provider(&self) -> &str;

    /// Model identifier sent with every request.
    fn model(&self) -> &str;

    /// Complete the conversation and return the full reply.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`](crate::ChatError::Config) when the key is
    /// rejected and [`ChatError::Llm`](crate::ChatError::Llm) for any other
    /// failure.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Stream the reply as text deltas. The channel closes when the reply ends.
    ///
    /// # Errors
    ///
    /// Fails like [`complete`](Self::complete) if the request cannot be
    /// started. Errors after the first delta arrive on the channel.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<mpsc::Receiver<Result<String>>>;
}

/// Drain a delta stream into one string.
///
/// # Errors
///
/// Returns the first error received on the channel.
pub async fn collect_stream(mut rx: mpsc::Receiver<Result<String>>) -> Result<String> {
    let mut text = String::new();
    while let Some(delta) = rx.recv().await {
        text.push_str(&delta?);
    }
    Ok(text)
}
