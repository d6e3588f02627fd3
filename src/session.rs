//! Per-session chat state.
//!
//! A [`ChatContext`] is created explicitly when a session starts, handed to
//! every page handler by `&mut`, and dropped when the session ends. The
//! [`SessionStore`] owns all live contexts for the server.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::llm::provider::{ProviderChoice, ProviderOverrides};

/// Author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A document the user attached to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub name: String,
    /// Where the document lives (path or URL).
    pub source: String,
}

/// Explicit per-session state passed to every page handler.
#[derive(Clone)]
pub struct ChatContext {
    pub id: Uuid,
    /// Page that produced the current transcript, if any.
    pub page: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Selected model; `None` uses the provider default.
    pub model: Option<String>,
    pub documents: Vec<DocumentRef>,
    /// Selected LLM provider.
    pub provider: ProviderChoice,
    /// Key typed in by the user for providers that accept one.
    pub api_key: Option<String>,
    /// Search reasoning steps, keyed by question id (`q_<index>`).
    pub thoughts: Vec<(String, Vec<String>)>,
    /// When the last turn finished. Idle sessions are swept.
    pub last_active: DateTime<Utc>,
}

impl ChatContext {
    pub fn new(provider: ProviderChoice) -> Self {
        Self {
            id: Uuid::new_v4(),
            page: None,
            messages: Vec::new(),
            model: None,
            documents: Vec::new(),
            provider,
            api_key: None,
            thoughts: Vec::new(),
            last_active: Utc::now(),
        }
    }

    /// Drop the transcript and everything derived from it.
    pub fn clear_history(&mut self) {
        self.messages.clear();
        self.thoughts.clear();
    }

    /// Id of the latest message, used to key its thought chain.
    pub fn question_id(&self) -> String {
        format!("q_{}", self.messages.len().saturating_sub(1))
    }

    /// Reasoning steps recorded for `question_id`.
    pub fn thoughts_for(&self, question_id: &str) -> Option<&[String]> {
        self.thoughts
            .iter()
            .find(|(id, _)| id == question_id)
            .map(|(_, steps)| steps.as_slice())
    }

    /// Provider inputs that came from the user rather than the config file.
    pub fn overrides(&self) -> ProviderOverrides {
        ProviderOverrides {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
        }
    }
}

impl fmt::Debug for ChatContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatContext")
            .field("id", &self.id)
            .field("page", &self.page)
            .field("messages", &self.messages.len())
            .field("model", &self.model)
            .field("documents", &self.documents)
            .field("provider", &self.provider)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// One live session.
///
/// The turn lock serializes chat turns. The context lock is only held long
/// enough to copy the context in or out, so transcript reads never wait on
/// a model or search call.
#[derive(Debug)]
pub struct Session {
    turn: Mutex<()>,
    context: Mutex<ChatContext>,
}

impl Session {
    fn new(context: ChatContext) -> Self {
        Self {
            turn: Mutex::new(()),
            context: Mutex::new(context),
        }
    }

    /// Wait for any running turn on this session, then hold it off until the
    /// guard drops.
    pub async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }

    /// A copy of the current context.
    pub async fn snapshot(&self) -> ChatContext {
        self.context.lock().await.clone()
    }

    /// Replace the context with the outcome of a turn.
    pub async fn commit(&self, mut context: ChatContext) {
        context.last_active = Utc::now();
        *self.context.lock().await = context;
    }

    /// Idle since `cutoff` and not in the middle of a turn.
    async fn idle_since(&self, cutoff: DateTime<Utc>) -> bool {
        let Ok(_turn) = self.turn.try_lock() else {
            return false;
        };
        self.context.lock().await.last_active < cutoff
    }
}

/// Shared handle to one live session.
pub type SessionHandle = Arc<Session>;

/// In-memory map of live sessions.
///
/// Two requests on the same session run one after the other while
/// different sessions proceed independently.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionHandle>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh context and return its id.
    pub async fn create(&self, context: ChatContext) -> Uuid {
        let id = context.id;
        self.sessions
            .lock()
            .await
            .insert(id, Arc::new(Session::new(context)));
        tracing::debug!(session = %id, "session created");
        id
    }

    /// The live session.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Session`] if the id is unknown.
    pub async fn handle(&self, id: Uuid) -> Result<SessionHandle> {
        self.sessions
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| ChatError::Session(format!("no session {id}")))
    }

    /// A snapshot of the session. Does not wait for a running turn.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Session`] if the id is unknown.
    pub async fn get(&self, id: Uuid) -> Result<ChatContext> {
        Ok(self.handle(id).await?.snapshot().await)
    }

    /// End a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        let existed = self.sessions.lock().await.remove(&id).is_some();
        if existed {
            tracing::debug!(session = %id, "session removed");
        }
        existed
    }

    /// Drop every session with no finished turn for `max_idle`. Returns how
    /// many were dropped.
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let mut sessions = self.sessions.lock().await;

        let mut idle = Vec::new();
        for (id, session) in sessions.iter() {
            if session.idle_since(cutoff).await {
                idle.push(*id);
            }
        }
        for id in &idle {
            sessions.remove(id);
        }
        if !idle.is_empty() {
            tracing::info!(
                removed = idle.len(),
                remaining = sessions.len(),
                "idle sessions swept"
            );
        }
        idle.len()
    }
}
