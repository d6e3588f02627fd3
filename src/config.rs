//! Application configuration loaded from `config.toml`.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8501
//!
//! [llm]
//! provider = "openrouter"
//!
//! [search]
//! max_attempts = 2
//! paid_backends = ["google_pse", "exa"]
//!
//! [secrets]
//! OPENROUTER_API_KEY = "sk-or-..."
//! ```
//!
//! Every table is optional. Secrets missing from `[secrets]` are looked up in
//! the process environment.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use omnichat_search::{SearchConfig, SearchCredentials};
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::llm::provider::ProviderChoice;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub secrets: Secrets,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
    /// Application title reported by `GET /api/pages`.
    pub title: String,
    /// Application icon reported by `GET /api/pages`.
    pub icon: String,
    /// Sessions with no chat turn for this long are dropped.
    pub session_idle_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8501,
            title: "OmniChat".to_owned(),
            icon: "💬".to_owned(),
            session_idle_minutes: 120,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider used when a session does not pick one.
    pub provider: ProviderChoice,
    /// Model override. Each provider has its own default.
    pub model: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// OpenAI API base URL.
    pub openai_base_url: String,
    /// OpenRouter API base URL.
    pub openrouter_base_url: String,
    /// OpenRouter model catalogue.
    pub openrouter_models_url: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderChoice::default(),
            model: None,
            temperature: 0.0,
            openai_base_url: "https://api.openai.com/v1".to_owned(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_owned(),
            openrouter_models_url: "https://openrouter.ai/api/v1/models".to_owned(),
            timeout_seconds: 120,
        }
    }
}

/// Secrets from the `[secrets]` table, keyed by environment-variable name.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secrets(BTreeMap<String, String>);

impl Secrets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Look up `name` in the file first, then the environment. Blank values
    /// count as absent.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.resolve_with(name, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with a custom environment lookup.
    pub fn resolve_with(&self, name: &str, env: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.0
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
            .or_else(|| env(name).filter(|v| !v.trim().is_empty()))
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Names only.
        f.debug_set().entries(self.0.keys()).finish()
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ChatError::Config {
            message: format!("invalid config file {}: {e}", path.display()),
            remediation: None,
        })
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ChatError::Config {
            message: format!("failed to serialize config: {e}"),
            remediation: None,
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/omnichat/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("omnichat").join("config.toml")
        } else if let Some(dir) = dirs::config_dir() {
            dir.join("omnichat").join("config.toml")
        } else {
            PathBuf::from("/tmp/omnichat-config/config.toml")
        }
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] for an out-of-range temperature, timeout
    /// or session idle limit, and [`ChatError::Search`] for an invalid `[search]` table.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ChatError::Config {
                message: "llm.temperature must be between 0.0 and 2.0".into(),
                remediation: None,
            });
        }
        if self.server.session_idle_minutes == 0 {
            return Err(ChatError::Config {
                message: "server.session_idle_minutes must be greater than 0".into(),
                remediation: None,
            });
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ChatError::Config {
                message: "llm.timeout_seconds must be greater than 0".into(),
                remediation: None,
            });
        }
        self.search.validate()?;
        Ok(())
    }

    /// The `[search]` table with paid-backend keys filled in from secrets.
    pub fn search_config(&self) -> SearchConfig {
        let from_secrets = SearchCredentials::from_lookup(|name| self.secrets.resolve(name));
        SearchConfig {
            credentials: self.search.credentials.clone().or(from_secrets),
            ..self.search.clone()
        }
    }
}
