//! Error types for the chat application.

use omnichat_search::SearchError;

/// Top-level error type for the chat server.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A required setting or credential is absent or invalid.
    ///
    /// `remediation` tells the user where to get what is missing.
    #[error("config error: {message}")]
    Config {
        message: String,
        remediation: Option<String>,
    },

    /// Language model request or stream error.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Search configuration error. Backend failures never reach this.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Unknown or expired session.
    #[error("session error: {0}")]
    Session(String),

    /// The request itself is unusable (e.g. an empty message).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No chat page is registered under this name.
    #[error("unknown page: {0}")]
    UnknownPage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Configuration error with remediation instructions.
    pub fn config(message: impl Into<String>, remediation: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            remediation: Some(remediation.into()),
        }
    }

    /// Plain-language message safe to show in the chat transcript.
    ///
    /// Only configuration errors carry their own text, since that text is
    /// written for the user. Everything else gets a fixed message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config {
                message,
                remediation: Some(remediation),
            } => format!("{message}\n\n{remediation}"),
            Self::Config {
                message,
                remediation: None,
            } => message.clone(),
            Self::Llm(_) => {
                "No se pudo obtener una respuesta del modelo. Por favor, inténtalo de nuevo más tarde."
                    .to_owned()
            }
            Self::Search(_) => {
                "La búsqueda en internet no está disponible en este momento.".to_owned()
            }
            Self::Session(_) => "La sesión no existe o ha finalizado.".to_owned(),
            Self::InvalidInput(reason) => reason.clone(),
            Self::UnknownPage(page) => format!("La página «{page}» no existe."),
            Self::Io(_) => "Algo salió mal. Por favor, inténtalo de nuevo más tarde.".to_owned(),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ChatError>;
