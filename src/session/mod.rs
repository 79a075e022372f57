//! Sessions.
//!
//! A session is one conversation: a sandbox directory, a message history,
//! a tool history and a handful of workspace facts. Sessions are created on
//! first reference and live until evicted, either explicitly or by the
//! [`SessionReaper`] once idle.
//!
//! ## Example
//!
//! ```rust,no_run
//! use code_workbench::session::{InMemorySessionStore, SessionStore};
//! use code_workbench::workspace::EscapePolicy;
//!
//! # async fn demo() -> Result<(), code_workbench::error::SessionError> {
//! let store = InMemorySessionStore::new("./workspace", EscapePolicy::Rebase);
//! let session = store.get_or_create(Some("demo")).await?;
//! let state = session.lock().await;
//! assert!(state.messages.is_empty());
//! # Ok(())
//! # }
//! ```

mod reaper;
mod state;
mod store;

pub use reaper::{ReaperHandle, SessionReaper};
pub use state::{ClonedRepo, SessionContext, SessionState, ToolRecord};
pub use store::{InMemorySessionStore, Session, SessionHandle, SessionStore, StateUpdate};
