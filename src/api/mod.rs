//! HTTP surface.
//!
//! An axum router over the session store and the orchestrator. Every
//! handler resolves its session through the store and holds that
//! session's lock for the rest of the request.
//!
//! ## Endpoints
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /chat` | One conversational turn |
//! | `POST /generate_code`, `/rewrite_code`, `/analyze_code`, `/generate_project` | Single-shot generation |
//! | `POST /upload`, `/upload/file/:id`, `/upload/files/:id` | Multipart uploads |
//! | `POST /index`, `/search_code`, `/api/execute`, `/api/github/clone` | Direct tool calls |
//! | `GET /workspace_info`, `/workspace/:id` | Directory listing |
//! | `POST /create/folder/:id`, `DELETE /workspace/:id/*path` | Folder management |
//! | `GET`/`DELETE /sessions/:id` | Session inspection and eviction |
//! | `GET /tools`, `/health`, `/ws` | Tool schemas, liveness, echo socket |

mod handlers;
pub mod types;

use crate::config::WorkbenchConfig;
use crate::dispatcher::ToolDispatcher;
use crate::error::WorkbenchError;
use crate::index::provider_from_config;
use crate::llm::{ModelCatalog, OpenAIClient};
use crate::orchestrator::Orchestrator;
use crate::session::{InMemorySessionStore, SessionReaper, SessionStore};
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

/// Largest accepted request body, uploads included.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct ServerState {
    /// Live sessions
    pub sessions: Arc<dyn SessionStore>,
    /// Conversation and tool execution
    pub orchestrator: Arc<Orchestrator>,
    /// Directory holding every session sandbox
    pub workspace_root: PathBuf,
}

impl ServerState {
    /// Creates server state from its parts.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        orchestrator: Arc<Orchestrator>,
        workspace_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sessions,
            orchestrator,
            workspace_root: workspace_root.into(),
        }
    }

    /// Builds the LLM client, embedding provider, dispatcher and session
    /// store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the LLM or embedding client cannot
    /// be constructed.
    pub fn from_config(config: &WorkbenchConfig) -> Result<Self, WorkbenchError> {
        let llm = OpenAIClient::from_config(&config.llm)
            .map_err(|e| WorkbenchError::configuration("llm", e.to_string()))?;
        let embedder = provider_from_config(&config.embedding)
            .map_err(|e| WorkbenchError::configuration("embedding", e.to_string()))?;

        let dispatcher =
            ToolDispatcher::new(config.tools.clone(), config.embedding.clone(), embedder);
        let orchestrator = Orchestrator::new(
            Arc::new(llm),
            dispatcher,
            ModelCatalog::new(config.llm.models.clone()),
            config.orchestrator.clone(),
            config.llm.system_prompt.clone(),
        );
        let store = InMemorySessionStore::new(&config.workspace.root, config.workspace.escape_policy)
            .with_remove_on_evict(config.session.remove_workspace_on_evict);

        Ok(Self::new(
            Arc::new(store),
            Arc::new(orchestrator),
            config.workspace.root.clone(),
        ))
    }
}

/// Builds the router with permissive CORS.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/chat", post(handlers::handle_chat))
        .route("/generate_code", post(handlers::handle_generate_code))
        .route("/rewrite_code", post(handlers::handle_rewrite_code))
        .route("/rewritten_code", post(handlers::handle_rewrite_code))
        .route("/analyze_code", post(handlers::handle_analyze_code))
        .route("/generate_project", post(handlers::handle_generate_project))
        .route("/upload", post(handlers::handle_upload))
        .route("/upload/file/:session_id", post(handlers::handle_upload_file))
        .route("/upload/files/:session_id", post(handlers::handle_upload_files))
        .route("/create/folder/:session_id", post(handlers::handle_create_folder))
        .route("/index", post(handlers::handle_index))
        .route("/search_code", post(handlers::handle_search_code))
        .route("/api/execute", post(handlers::handle_execute))
        .route("/api/github/clone", post(handlers::handle_clone))
        .route("/workspace_info", get(handlers::handle_workspace_info))
        .route("/workspace/:session_id", get(handlers::handle_workspace))
        .route("/workspace/:session_id/*path", delete(handlers::handle_delete_path))
        .route(
            "/sessions/:session_id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/tools", get(handlers::handle_list_tools))
        .route("/health", get(handlers::handle_health))
        .route("/ws", get(handlers::handle_ws))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `listener` until ctrl-c, sweeping idle sessions in
/// the background.
///
/// # Errors
///
/// Returns a launch error if the server stops abnormally.
pub async fn serve(
    listener: TcpListener,
    state: ServerState,
    config: &WorkbenchConfig,
) -> Result<(), WorkbenchError> {
    let reaper = SessionReaper::spawn(
        Arc::clone(&state.sessions),
        config.session.reap_interval(),
        config.session.idle_timeout(),
    );

    let address = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_default();
    tracing::info!(%address, workspace = %state.workspace_root.display(), "listening");

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| WorkbenchError::launch_failed(e.to_string()));

    reaper.shutdown().await;
    tracing::info!("server stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
