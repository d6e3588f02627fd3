//! Single-turn chatbot.

use async_trait::async_trait;

use super::ChatPage;
use crate::error::Result;
use crate::llm::{LlmClient, collect_stream};
use crate::session::{ChatContext, ChatMessage};

/// Sends only the latest question, with no memory of earlier turns.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPage;

#[async_trait]
impl ChatPage for BasicPage {
    fn name(&self) -> &str {
        "basic"
    }

    fn title(&self) -> &str {
        "Chatbot Básico"
    }

    fn icon(&self) -> &str {
        "💬"
    }

    fn description(&self) -> &str {
        "Permite a los usuarios interactuar con el LLM"
    }

    async fn handle(
        &self,
        ctx: &mut ChatContext,
        llm: &dyn LlmClient,
        input: &str,
    ) -> Result<String> {
        tracing::debug!(session = %ctx.id, model = llm.model(), "basic chat turn");
        let rx = llm.stream(&[ChatMessage::user(input)]).await?;
        collect_stream(rx).await
    }
}
