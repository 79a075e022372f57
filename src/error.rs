//! Custom error types for code-workbench.
//!
//! Top-level errors live here. Module-specific errors live next to their
//! module (`tools::ToolError`, `llm::LLMError`, `workspace::SandboxError`,
//! `index::EmbeddingError`). Each error type implements Display, Debug, Clone
//! and std::error::Error.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use crate::llm::LLMError;
use crate::tools::{ToolError, ToolErrorCategory};
use crate::types::SessionId;
use std::fmt;
use std::path::PathBuf;

/// Errors raised while configuring or launching the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbenchError {
    /// The specific error that occurred
    pub kind: WorkbenchErrorKind,
}

/// Specific top-level error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchErrorKind {
    /// Configuration error
    Configuration {
        /// Description of what was invalid
        field: String,
        /// Why it was invalid
        reason: String,
    },
    /// Failed to start the HTTP server
    LaunchFailed {
        /// Reason for the failure
        reason: String,
    },
}

impl WorkbenchError {
    /// Creates a new WorkbenchError with the given kind.
    #[must_use]
    pub fn new(kind: WorkbenchErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(WorkbenchErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a launch failed error.
    #[must_use]
    pub fn launch_failed(reason: impl Into<String>) -> Self {
        Self::new(WorkbenchErrorKind::LaunchFailed {
            reason: reason.into(),
        })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, WorkbenchErrorKind::Configuration { .. })
    }
}

impl fmt::Display for WorkbenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            WorkbenchErrorKind::Configuration { field, reason } => {
                write!(f, "configuration error for '{}': {}", field, reason)
            }
            WorkbenchErrorKind::LaunchFailed { reason } => {
                write!(
                    f,
                    "failed to launch server: {}; check the bind address and port",
                    reason
                )
            }
        }
    }
}

impl std::error::Error for WorkbenchError {}

/// Errors raised by the session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    /// The specific error that occurred
    pub kind: SessionErrorKind,
}

/// Specific session error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The supplied session identifier is not acceptable
    InvalidId {
        /// Why it was rejected
        reason: String,
    },
    /// The session's workspace directory could not be created
    ProvisionFailed {
        /// The directory that could not be created
        path: PathBuf,
        /// Why it failed
        reason: String,
    },
    /// No session exists with this identifier
    NotFound {
        /// The identifier that was looked up
        session_id: SessionId,
    },
}

impl SessionError {
    /// Creates a new SessionError with the given kind.
    #[must_use]
    pub fn new(kind: SessionErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an invalid id error.
    #[must_use]
    pub fn invalid_id(reason: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::InvalidId {
            reason: reason.into(),
        })
    }

    /// Creates a provision failed error.
    #[must_use]
    pub fn provision_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::ProvisionFailed {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(session_id: SessionId) -> Self {
        Self::new(SessionErrorKind::NotFound { session_id })
    }

    /// Returns true if the caller supplied a bad identifier.
    #[must_use]
    pub fn is_invalid_id(&self) -> bool {
        matches!(self.kind, SessionErrorKind::InvalidId { .. })
    }

    /// Returns true if the session does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, SessionErrorKind::NotFound { .. })
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SessionErrorKind::InvalidId { reason } => {
                write!(f, "invalid session ID: {}", reason)
            }
            SessionErrorKind::ProvisionFailed { path, reason } => {
                write!(
                    f,
                    "failed to provision workspace '{}': {}; check that the workspace root is writable",
                    path.display(),
                    reason
                )
            }
            SessionErrorKind::NotFound { session_id } => {
                write!(f, "Session not found: {}", session_id)
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Errors that abort a conversation turn or a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorError {
    /// The specific error that occurred
    pub kind: OrchestratorErrorKind,
}

/// Specific orchestrator error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorErrorKind {
    /// The LLM call failed; the turn was aborted without retry
    Upstream(LLMError),
    /// A tool step of a single-shot operation failed
    Tool {
        /// Category of the tool failure
        category: ToolErrorCategory,
        /// The tool's error message
        message: String,
    },
    /// The model returned output that could not be used
    InvalidModelOutput {
        /// What was wrong with the output
        reason: String,
    },
}

impl OrchestratorError {
    /// Creates a new OrchestratorError with the given kind.
    #[must_use]
    pub fn new(kind: OrchestratorErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a tool failure error.
    #[must_use]
    pub fn tool_failed(category: ToolErrorCategory, message: impl Into<String>) -> Self {
        Self::new(OrchestratorErrorKind::Tool {
            category,
            message: message.into(),
        })
    }

    /// Creates an invalid model output error.
    #[must_use]
    pub fn invalid_model_output(reason: impl Into<String>) -> Self {
        Self::new(OrchestratorErrorKind::InvalidModelOutput {
            reason: reason.into(),
        })
    }

    /// Returns true if the LLM call itself failed.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        matches!(self.kind, OrchestratorErrorKind::Upstream(_))
    }
}

impl From<LLMError> for OrchestratorError {
    fn from(error: LLMError) -> Self {
        Self::new(OrchestratorErrorKind::Upstream(error))
    }
}

impl From<ToolError> for OrchestratorError {
    fn from(error: ToolError) -> Self {
        Self::tool_failed(error.category(), error.to_string())
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OrchestratorErrorKind::Upstream(e) => write!(f, "LLM request failed: {}", e),
            OrchestratorErrorKind::Tool { message, .. } => write!(f, "{}", message),
            OrchestratorErrorKind::InvalidModelOutput { reason } => {
                write!(f, "model returned unusable output: {}", reason)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}
