//! OmniChat: a multi-page chat server over OpenAI-compatible LLM providers.
//!
//! Each chat page is a different way of answering:
//! - **basic**: one question, one answer
//! - **memory**: the whole conversation is sent every turn
//! - **internet**: answers from web search, with a free-first backend chain
//!   and a synthesized answer when every backend fails
//!
//! Sessions hold their own [`ChatContext`] and are served over HTTP by
//! [`server::ChatServer`].

pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod pages;
pub mod server;
pub mod session;

pub use config::{AppConfig, LlmConfig, Secrets, ServerConfig};
pub use error::{ChatError, Result};
pub use history::{GREETING, enable_chat_history};
pub use llm::{LlmClient, ProviderChoice, ProviderConfig};
pub use pages::{ChatPage, PageRegistry};
pub use session::{ChatContext, ChatMessage, Role, SessionStore};
