//! Language model access.
//!
//! Every provider speaks the OpenAI chat completions protocol, so one
//! [`OpenAiCompatClient`] covers them all. [`ProviderConfig`] decides which
//! endpoint, key and model a session gets.

pub mod client;
pub mod openai_compat;
pub mod openrouter;
pub mod provider;
pub mod sse;

pub use client::{LlmClient, collect_stream};
pub use openai_compat::OpenAiCompatClient;
pub use openrouter::{ModelInfo, default_free_models, fetch_free_models, multimodal_only};
pub use provider::{ProviderChoice, ProviderConfig, ProviderOverrides};
