//! LLM access.
//!
//! [`LLMClient`] is the seam the orchestrator calls through. [`OpenAIClient`]
//! speaks the OpenAI-compatible chat-completions protocol, which covers the
//! hosted providers this backend is pointed at. [`ModelCatalog`] routes each
//! request type to a configured model, and the token helpers keep prompts
//! within budget.

mod catalog;
mod client;
mod error;
mod openai;
mod tokens;

pub use catalog::{ModelCatalog, ModelSpec, ModelTask, BEST_AVAILABLE};
pub use client::{LLMClient, LLMClientResponse, SamplingParams};
pub use error::{LLMError, LLMErrorKind};
pub use openai::OpenAIClient;
pub use tokens::{count_tokens, fit_history, history_tokens, message_tokens};
