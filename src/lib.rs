//! # code-workbench: tool-calling backend for LLM code assistants
//!
//! Each conversation gets its own sandbox directory. A language model
//! works in that directory through a closed set of tools: file reads and
//! writes, listings, searches, shell commands, project scaffolding, git
//! clones and semantic code search.
//!
//! ## Architecture
//!
//! - **Workspace** ([`workspace`]): per-session directory and path containment
//! - **Tools** ([`tools`]): the nine built-in tools and their typed arguments
//! - **Index** ([`index`]): chunking, embeddings and the per-session vector index
//! - **Sessions** ([`session`]): the session store, per-session locking and idle eviction
//! - **LLM** ([`llm`]): the chat-completions client and model catalog
//! - **Dispatcher** ([`dispatcher`]): runs tool calls and records their outcomes
//! - **Orchestrator** ([`orchestrator`]): conversation turns and single-shot generation
//! - **API** ([`api`]): the axum HTTP surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use code_workbench::api::{self, ServerState};
//! use code_workbench::config;
//!
//! # async fn run() -> Result<(), code_workbench::error::WorkbenchError> {
//! let config = config::load()?;
//! let state = ServerState::from_config(&config)?;
//! let listener = tokio::net::TcpListener::bind(config.server.bind_address())
//!     .await
//!     .map_err(|e| code_workbench::error::WorkbenchError::launch_failed(e.to_string()))?;
//! api::serve(listener, state, &config).await
//! # }
//! ```

pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod index;
pub mod llm;
pub mod logging;
pub mod messages;
pub mod orchestrator;
pub mod session;
pub mod tools;
pub mod types;
pub mod workspace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::WorkbenchConfig;
    pub use crate::dispatcher::ToolDispatcher;
    pub use crate::error::{OrchestratorError, SessionError, WorkbenchError};
    pub use crate::llm::{LLMClient, LLMClientResponse, ModelCatalog, SamplingParams};
    pub use crate::messages::{Message, MessageRole, ToolCall, ToolDefinition};
    pub use crate::orchestrator::{Orchestrator, TurnOutcome};
    pub use crate::session::{InMemorySessionStore, SessionHandle, SessionState, SessionStore};
    pub use crate::tools::{ToolInvocation, ToolKind, ToolOutcome};
    pub use crate::types::SessionId;
    pub use crate::workspace::{EscapePolicy, WorkspaceSandbox};
}
