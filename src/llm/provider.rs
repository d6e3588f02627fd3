//! Provider selection.
//!
//! A session picks a [`ProviderChoice`]. [`ProviderConfig::resolve`] turns it
//! into a fully validated configuration once, and
//! [`ProviderConfig::into_client`] builds the client every page uses.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::client::LlmClient;
use super::openai_compat::OpenAiCompatClient;
use super::openrouter::{self, OPENROUTER_REFERER, OPENROUTER_TITLE};
use crate::config::{LlmConfig, Secrets};
use crate::error::{ChatError, Result};

/// Model used with the server's own OpenAI key.
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// Model used with a key the user typed in.
pub const CUSTOM_KEY_DEFAULT_MODEL: &str = "gpt-4o-mini";

const OPENAI_KEY_URL: &str = "https://platform.openai.com/account/api-keys";
const OPENROUTER_KEY_URL: &str = "https://openrouter.ai/keys";

/// Which LLM provider a session talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderChoice {
    /// OpenAI with the key from `[secrets]`.
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// OpenAI with a key supplied by the user.
    #[serde(rename = "custom_key")]
    CustomKey,
}

impl fmt::Display for ProviderChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::OpenRouter => write!(f, "openrouter"),
            Self::CustomKey => write!(f, "custom_key"),
        }
    }
}

/// Per-session inputs that override configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOverrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

#[derive(Clone)]
pub struct CustomKeyConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

/// A validated provider configuration. Holding one means the key exists.
#[derive(Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiConfig),
    OpenRouter(OpenRouterConfig),
    CustomKey(CustomKeyConfig),
}

fn present(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).cloned()
}

impl ProviderConfig {
    /// Resolve `choice` against configuration, secrets and session input.
    ///
    /// The model comes from the session first, then `[llm] model` when the
    /// configured provider matches, then the provider default.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] naming where to get a key when the
    /// provider has none.
    pub fn resolve(
        choice: ProviderChoice,
        llm: &LlmConfig,
        secrets: &Secrets,
        overrides: &ProviderOverrides,
    ) -> Result<Self> {
        let model = |default: &str| {
            present(overrides.model.as_ref())
                .or_else(|| present(llm.model.as_ref()).filter(|_| llm.provider == choice))
                .unwrap_or_else(|| default.to_owned())
        };

        match choice {
            ProviderChoice::OpenAi => {
                let api_key = secrets.resolve("OPENAI_API_KEY").ok_or_else(|| {
                    ChatError::config(
                        "No se encontró la clave API de OpenAI en la configuración.",
                        format!("Obtén tu clave de este enlace: {OPENAI_KEY_URL}"),
                    )
                })?;
                Ok(Self::OpenAi(OpenAiConfig {
                    api_key,
                    model: model(OPENAI_DEFAULT_MODEL),
                    base_url: llm.openai_base_url.clone(),
                    temperature: llm.temperature,
                }))
            }
            ProviderChoice::OpenRouter => {
                let api_key = secrets
                    .resolve("OPENROUTER_API_KEY")
                    .or_else(|| present(overrides.api_key.as_ref()))
                    .ok_or_else(|| {
                        ChatError::config(
                            "Por favor, añade tu clave API de OpenRouter para continuar.",
                            format!("Obtén tu clave en: {OPENROUTER_KEY_URL}"),
                        )
                    })?;
                let default_model = openrouter::default_free_models()
                    .into_iter()
                    .next()
                    .map(|m| m.id)
                    .unwrap_or_default();
                Ok(Self::OpenRouter(OpenRouterConfig {
                    api_key,
                    model: model(&default_model),
                    base_url: llm.openrouter_base_url.clone(),
                    temperature: llm.temperature,
                }))
            }
            ProviderChoice::CustomKey => {
                let api_key = present(overrides.api_key.as_ref()).ok_or_else(|| {
                    ChatError::config(
                        "Por favor, añade tu clave de API de OpenAI para continuar.",
                        format!("Obtén tu clave de este enlace: {OPENAI_KEY_URL}"),
                    )
                })?;
                Ok(Self::CustomKey(CustomKeyConfig {
                    api_key,
                    model: model(CUSTOM_KEY_DEFAULT_MODEL),
                    base_url: llm.openai_base_url.clone(),
                    temperature: llm.temperature,
                }))
            }
        }
    }

    pub fn choice(&self) -> ProviderChoice {
        match self {
            Self::OpenAi(_) => ProviderChoice::OpenAi,
            Self::OpenRouter(_) => ProviderChoice::OpenRouter,
            Self::CustomKey(_) => ProviderChoice::CustomKey,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(c) => &c.model,
            Self::OpenRouter(c) => &c.model,
            Self::CustomKey(c) => &c.model,
        }
    }

    /// Build the client for this provider.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Llm`] if the HTTP client cannot be built.
    pub fn into_client(self, timeout: Duration) -> Result<Arc<dyn LlmClient>> {
        let client = match self {
            Self::OpenAi(c) => {
                OpenAiCompatClient::new("OpenAI", c.base_url, c.api_key, c.model, timeout)?
                    .with_temperature(c.temperature)
                    .with_remediation(format!("Obtén tu clave de este enlace: {OPENAI_KEY_URL}"))
            }
            Self::OpenRouter(c) => {
                OpenAiCompatClient::new("OpenRouter", c.base_url, c.api_key, c.model, timeout)?
                    .with_temperature(c.temperature)
                    .with_header("HTTP-Referer", OPENROUTER_REFERER)
                    .with_header("X-Title", OPENROUTER_TITLE)
                    .with_remediation(format!("Obtén tu clave en: {OPENROUTER_KEY_URL}"))
            }
            Self::CustomKey(c) => {
                OpenAiCompatClient::new("OpenAI", c.base_url, c.api_key, c.model, timeout)?
                    .with_temperature(c.temperature)
                    .with_remediation(format!("Obtén tu clave de este enlace: {OPENAI_KEY_URL}"))
            }
        };
        tracing::debug!(provider = client.provider(), model = client.model(), "LLM client ready");
        Ok(Arc::new(client))
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (base_url, temperature) = match self {
            Self::OpenAi(c) => (&c.base_url, c.temperature),
            Self::OpenRouter(c) => (&c.base_url, c.temperature),
            Self::CustomKey(c) => (&c.base_url, c.temperature),
        };
        f.debug_struct("ProviderConfig")
            .field("choice", &self.choice())
            .field("model", &self.model())
            .field("base_url", base_url)
            .field("temperature", &temperature)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
