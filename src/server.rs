//! HTTP API for the chat pages.
//!
//! | Method | Path | |
//! |---|---|---|
//! | GET | `/health` | liveness |
//! | GET | `/api/pages` | app title and the chat pages |
//! | GET | `/api/models` | free OpenRouter models |
//! | POST | `/api/sessions` | start a session |
//! | DELETE | `/api/sessions/{id}` | end a session |
//! | GET | `/api/sessions/{id}/messages` | transcript and thought chains |
//! | POST | `/api/sessions/{id}/chat/{page}` | send a message to a page |
//!
//! Errors are returned as `{"error": "<plain-language message>"}`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{ChatError, Result};
use crate::history::enable_chat_history;
use crate::llm::{ModelInfo, ProviderChoice, ProviderConfig, fetch_free_models, multimodal_only};
use crate::pages::{PageInfo, PageRegistry};
use crate::session::{ChatContext, ChatMessage, DocumentRef, SessionStore};

/// Everything a request handler needs.
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    pub pages: PageRegistry,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig, pages: PageRegistry) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            pages,
            http: reqwest::Client::new(),
        }
    }

    fn resolve_provider(&self, ctx: &ChatContext) -> Result<ProviderConfig> {
        ProviderConfig::resolve(
            ctx.provider,
            &self.config.llm,
            &self.config.secrets,
            &ctx.overrides(),
        )
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

type SharedState = Arc<AppState>;

impl ChatError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Config { .. } | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::UnknownPage(_) => StatusCode::NOT_FOUND,
            Self::Llm(_) => StatusCode::BAD_GATEWAY,
            Self::Search(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({ "error": self.user_message() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PagesResponse {
    pub title: String,
    pub icon: String,
    pub pages: Vec<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSessionRequest {
    pub provider: Option<ProviderChoice>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub documents: Vec<DocumentRef>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: Uuid,
    pub provider: ProviderChoice,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub question_id: String,
    /// Reasoning steps, for pages that record them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThoughtChain {
    pub question_id: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub page: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub thoughts: Vec<ThoughtChain>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ModelsQuery {
    pub multimodal: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/api/pages", get(handle_pages))
        .route("/api/models", get(handle_models))
        .route("/api/sessions", post(handle_create_session))
        .route("/api/sessions/{id}", delete(handle_delete_session))
        .route("/api/sessions/{id}/messages", get(handle_messages))
        .route("/api/sessions/{id}/chat/{page}", post(handle_chat))
        .with_state(state)
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_pages(State(state): State<SharedState>) -> Json<PagesResponse> {
    Json(PagesResponse {
        title: state.config.server.title.clone(),
        icon: state.config.server.icon.clone(),
        pages: state.pages.list(),
    })
}

async fn handle_models(
    State(state): State<SharedState>,
    Query(query): Query<ModelsQuery>,
) -> Json<Vec<ModelInfo>> {
    let api_key = state.config.secrets.resolve("OPENROUTER_API_KEY");
    let url = &state.config.llm.openrouter_models_url;
    let models = fetch_free_models(&state.http, url, api_key.as_deref()).await;
    Json(if query.multimodal {
        multimodal_only(models)
    } else {
        models
    })
}

async fn handle_create_session(
    State(state): State<SharedState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let mut ctx = ChatContext::new(request.provider.unwrap_or(state.config.llm.provider));
    ctx.model = request.model;
    ctx.api_key = request.api_key;
    ctx.documents = request.documents;

    // Reject a provider without a key up front, like the settings sidebar does.
    let provider = state.resolve_provider(&ctx)?;
    let response = SessionResponse {
        id: ctx.id,
        provider: provider.choice(),
        model: provider.model().to_owned(),
    };

    state.sessions.create(ctx).await;
    info!(
        session = %response.id,
        provider = %response.provider,
        model = %response.model,
        "session started"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

async fn handle_delete_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.sessions.remove(id).await {
        info!(session = %id, "session ended");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ChatError::Session(format!("no session {id}")))
    }
}

async fn handle_messages(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessagesResponse>> {
    let ctx = state.sessions.get(id).await?;
    Ok(Json(MessagesResponse {
        page: ctx.page,
        messages: ctx.messages,
        thoughts: ctx
            .thoughts
            .into_iter()
            .map(|(question_id, steps)| ThoughtChain { question_id, steps })
            .collect(),
    }))
}

async fn handle_chat(
    State(state): State<SharedState>,
    Path((id, page_name)): Path<(Uuid, String)>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ChatError::InvalidInput("El mensaje no puede estar vacío.".into()));
    }
    let page = state
        .pages
        .get(&page_name)
        .ok_or_else(|| ChatError::UnknownPage(page_name.clone()))?;

    let session = state.sessions.handle(id).await?;
    // Held for the whole turn so one session answers one message at a time.
    let _turn = session.begin_turn().await;
    let mut ctx = session.snapshot().await;

    let llm = state
        .resolve_provider(&ctx)?
        .into_client(Duration::from_secs(state.config.llm.timeout_seconds))?;

    let result = enable_chat_history(&mut ctx, page.as_ref(), llm.as_ref(), message).await;
    let question_id = format!("q_{}", ctx.messages.len().saturating_sub(2));
    let thoughts = ctx.thoughts_for(&question_id).map(<[String]>::to_vec);
    // A failed turn still keeps the user's message.
    session.commit(ctx).await;
    let reply = result?;

    Ok(Json(ChatResponse {
        reply,
        question_id,
        thoughts,
    }))
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// A year; keeps the idle cutoff inside `chrono`'s range.
const MAX_IDLE_MINUTES: i64 = 60 * 24 * 365;

/// A running chat server.
pub struct ChatServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl ChatServer {
    /// Bind `{host}:{port}` (port `0` picks a free one) and serve in the
    /// background.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind.
    pub async fn start(state: AppState) -> Result<Self> {
        let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        let addr = listener.local_addr()?;

        let state = Arc::new(state);
        let sweeper = tokio::spawn(sweep_sessions(Arc::clone(&state)));
        let app = router(state);
        info!("chat server listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("chat server error: {e}");
            }
        });

        Ok(Self {
            addr,
            handle,
            sweeper,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server and session sweep tasks.
    pub fn shutdown(&self) {
        self.handle.abort();
        self.sweeper.abort();
    }
}

impl Drop for ChatServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Drop sessions idle for longer than `server.session_idle_minutes`.
async fn sweep_sessions(state: SharedState) {
    let minutes = state.config.server.session_idle_minutes;
    let minutes = i64::try_from(minutes).unwrap_or(i64::MAX).min(MAX_IDLE_MINUTES);
    let max_idle = chrono::Duration::minutes(minutes);
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        state.sessions.sweep_idle(max_idle).await;
    }
}
