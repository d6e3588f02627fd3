//! Transcript bookkeeping shared by every chat page.

use crate::error::Result;
use crate::llm::LlmClient;
use crate::pages::ChatPage;
use crate::session::{ChatContext, ChatMessage, Role};

/// First assistant message of every transcript.
pub const GREETING: &str = "Hola, soy un asistente virtual. ¿En qué puedo ayudarte hoy?";

/// Run one chat turn on `page` with history management around it.
///
/// Switching to a different page starts a fresh transcript. An empty
/// transcript is seeded with [`GREETING`]. The user's input is recorded
/// before the page runs and its reply after. When the page fails the user
/// message stays and no reply is recorded.
///
/// # Errors
///
/// Returns whatever the page returns.
pub async fn enable_chat_history(
    ctx: &mut ChatContext,
    page: &dyn ChatPage,
    llm: &dyn LlmClient,
    input: &str,
) -> Result<String> {
    prepare(ctx, page.name());
    display_msg(ctx, input, Role::User);

    let reply = page.handle(ctx, llm, input).await?;

    display_msg(ctx, &reply, Role::Assistant);
    Ok(reply)
}

/// Reset the transcript on page change and seed the greeting.
pub fn prepare(ctx: &mut ChatContext, page_name: &str) {
    if ctx.page.as_deref() != Some(page_name) {
        if let Some(previous) = ctx.page.as_deref() {
            tracing::debug!(
                session = %ctx.id,
                from = previous,
                to = page_name,
                "page changed; clearing history"
            );
        }
        ctx.clear_history();
        ctx.page = Some(page_name.to_owned());
    }
    if ctx.messages.is_empty() {
        ctx.messages.push(ChatMessage::assistant(GREETING));
    }
}

/// Append a message to the transcript.
pub fn display_msg(ctx: &mut ChatContext, msg: &str, role: Role) {
    ctx.messages.push(ChatMessage::new(role, msg));
}

/// The transcript without the seeded greeting, ready to send to a model.
pub fn conversation(ctx: &ChatContext) -> &[ChatMessage] {
    match ctx.messages.first() {
        Some(first) if first.role == Role::Assistant && first.content == GREETING => {
            &ctx.messages[1..]
        }
        _ => &ctx.messages,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use crate::llm::ProviderChoice;

    #[test]
    fn prepare_seeds_greeting_once() {
        let mut ctx = ChatContext::new(ProviderChoice::OpenAi);
        prepare(&mut ctx, "basic");
        prepare(&mut ctx, "basic");
        assert_eq!(ctx.messages, vec![ChatMessage::assistant(GREETING)]);
        assert_eq!(ctx.page.as_deref(), Some("basic"));
    }

    #[test]
    fn page_change_clears_history() {
        let mut ctx = ChatContext::new(ProviderChoice::OpenAi);
        prepare(&mut ctx, "memory");
        display_msg(&mut ctx, "me llamo Ana", Role::User);
        ctx.thoughts.push(("q_1".into(), vec!["x".into()]));

        prepare(&mut ctx, "internet");
        assert_eq!(ctx.messages.len(), 1);
        assert!(ctx.thoughts.is_empty());
        assert_eq!(ctx.page.as_deref(), Some("internet"));
    }

    #[test]
    fn same_page_keeps_history() {
        let mut ctx = ChatContext::new(ProviderChoice::OpenAi);
        prepare(&mut ctx, "memory");
        display_msg(&mut ctx, "hola", Role::User);
        prepare(&mut ctx, "memory");
        assert_eq!(ctx.messages.len(), 2);
    }

    #[test]
    fn conversation_skips_greeting() {
        let mut ctx = ChatContext::new(ProviderChoice::OpenAi);
        prepare(&mut ctx, "memory");
        display_msg(&mut ctx, "hola", Role::User);
        assert_eq!(conversation(&ctx), &[ChatMessage::user("hola")]);

        let bare = ChatContext::new(ProviderChoice::OpenAi);
        assert!(conversation(&bare).is_empty());
    }
}
