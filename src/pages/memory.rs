//! Chatbot that remembers the conversation.

use async_trait::async_trait;

use super::ChatPage;
use crate::error::Result;
use crate::history::conversation;
use crate::llm::{LlmClient, collect_stream};
use crate::session::ChatContext;

/// Sends the whole transcript so the model can refer back to earlier turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPage;

#[async_trait]
impl ChatPage for MemoryPage {
    fn name(&self) -> &str {
        "memory"
    }

    fn title(&self) -> &str {
        "Chatbot con Memoria"
    }

    fn icon(&self) -> &str {
        "🧠"
    }

    fn description(&self) -> &str {
        "Recuerda las conversaciones anteriores para dar respuestas con contexto"
    }

    async fn handle(
        &self,
        ctx: &mut ChatContext,
        llm: &dyn LlmClient,
        _input: &str,
    ) -> Result<String> {
        let history = conversation(ctx);
        tracing::debug!(session = %ctx.id, turns = history.len(), "memory chat turn");
        let rx = llm.stream(history).await?;
        collect_stream(rx).await
    }
}
