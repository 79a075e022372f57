//! Tagged tool results.

use crate::tools::{ToolError, ToolErrorCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The result of one tool invocation.
///
/// Serialized with a `status` tag:
/// `{"status":"success","payload":{..}}` or
/// `{"status":"failure","kind":"not_found","error":"File not found: a.py"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool ran and produced a payload
    Success {
        /// Tool-specific result data
        payload: Value,
    },
    /// The tool could not complete
    Failure {
        /// Error category
        kind: ToolErrorCategory,
        /// Human-readable error
        error: String,
    },
}

impl ToolOutcome {
    /// Creates a success outcome.
    #[must_use]
    pub fn success(payload: Value) -> Self {
        Self::Success { payload }
    }

    /// Creates a failure outcome from an error.
    #[must_use]
    pub fn failure(error: &ToolError) -> Self {
        Self::Failure {
            kind: error.category(),
            error: error.to_string(),
        }
    }

    /// Returns true for a success outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the payload of a success outcome.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    /// Returns the error message of a failure outcome.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    /// Returns the category of a failure outcome.
    #[must_use]
    pub fn error_kind(&self) -> Option<ToolErrorCategory> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Renders the outcome as the content of a tool-result message.
    #[must_use]
    pub fn to_message_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"failure","kind":"internal","error":"{e}"}}"#)
        })
    }
}

impl From<Result<Value, ToolError>> for ToolOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(payload) => Self::success(payload),
            Err(error) => Self::failure(&error),
        }
    }
}
