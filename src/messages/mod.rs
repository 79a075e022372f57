//! Conversation message types.
//!
//! These are the provider-neutral shapes exchanged between the session
//! history, the orchestrator and the LLM client.

mod types;

pub use types::*;
