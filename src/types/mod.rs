//! Core identifier types.
//!
//! - `SessionId`: path-safe session token, generated as a TypeID when absent
//! - `ToolCallId`: identifier for tool calls that did not originate from a model

mod session_id;
mod tool_call_id;

pub use session_id::{InvalidSessionId, SessionId};
pub use tool_call_id::ToolCallId;
