//! Tool error types.
//!
//! Every failure a tool can produce is a `ToolError`. The dispatcher turns
//! these into failure outcomes so no tool error ever reaches a request
//! handler as a fault.

use crate::workspace::{SandboxError, SandboxErrorKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Errors that can occur in tool operations.
///
/// This type uses Box<ToolErrorKind> to keep the error size small,
/// enabling efficient use in Result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// Arguments were missing, malformed, or semantically invalid
    InvalidArguments {
        /// The tool that rejected its arguments
        tool_name: String,
        /// What was invalid
        reason: String,
    },
    /// No tool with this name exists
    UnknownTool {
        /// The requested name
        name: String,
        /// Closest known tool name, if any is similar
        suggestion: Option<String>,
    },
    /// A path argument violated sandbox containment
    Containment {
        /// Description of the violation
        message: String,
    },
    /// `search_code` ran before anything was indexed
    NotIndexed,
    /// A file or directory does not exist
    NotFound {
        /// What was missing ("File", "Directory", ...)
        what: String,
        /// The path as supplied by the caller
        path: String,
    },
    /// A filesystem or process operation failed
    Resource {
        /// Description of the failure
        reason: String,
    },
    /// A subprocess exceeded its time budget and was killed
    Timeout {
        /// The operation that timed out ("Command", "Clone")
        operation: String,
        /// The budget that was exceeded
        duration: Duration,
    },
    /// An external service (embeddings) failed
    Upstream {
        /// Description of the failure
        reason: String,
    },
    /// Unexpected internal failure
    Internal {
        /// Description of the internal error
        message: String,
    },
}

/// Coarse classification of tool errors.
///
/// Used for the `kind` field of failure outcomes and for HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorCategory {
    /// Caller supplied something invalid
    Validation,
    /// Requested path does not exist
    NotFound,
    /// Filesystem or process failure
    Resource,
    /// Time budget exceeded
    Timeout,
    /// External service failure
    Upstream,
    /// Unexpected failure
    Internal,
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Creates an invalid arguments error.
    #[must_use]
    pub fn invalid_arguments(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArguments {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an unknown tool error.
    #[must_use]
    pub fn unknown_tool(name: impl Into<String>, suggestion: Option<String>) -> Self {
        Self::new(ToolErrorKind::UnknownTool {
            name: name.into(),
            suggestion,
        })
    }

    /// Creates a file not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound {
            what: "File".to_string(),
            path: path.into(),
        })
    }

    /// Creates a directory not found error.
    #[must_use]
    pub fn directory_not_found(path: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound {
            what: "Directory".to_string(),
            path: path.into(),
        })
    }

    /// Creates the error returned when searching an empty index.
    #[must_use]
    pub fn not_indexed() -> Self {
        Self::new(ToolErrorKind::NotIndexed)
    }

    /// Creates a resource error.
    #[must_use]
    pub fn resource(reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Resource {
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::new(ToolErrorKind::Timeout {
            operation: operation.into(),
            duration,
        })
    }

    /// Creates an upstream error.
    #[must_use]
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Upstream {
            reason: reason.into(),
        })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal {
            message: message.into(),
        })
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub fn category(&self) -> ToolErrorCategory {
        match *self.kind {
            ToolErrorKind::InvalidArguments { .. }
            | ToolErrorKind::UnknownTool { .. }
            | ToolErrorKind::Containment { .. }
            | ToolErrorKind::NotIndexed => ToolErrorCategory::Validation,
            ToolErrorKind::NotFound { .. } => ToolErrorCategory::NotFound,
            ToolErrorKind::Resource { .. } => ToolErrorCategory::Resource,
            ToolErrorKind::Timeout { .. } => ToolErrorCategory::Timeout,
            ToolErrorKind::Upstream { .. } => ToolErrorCategory::Upstream,
            ToolErrorKind::Internal { .. } => ToolErrorCategory::Internal,
        }
    }

    /// Returns true if this error indicates the tool was not found.
    #[must_use]
    pub fn is_unknown_tool(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::UnknownTool { .. })
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Timeout { .. })
    }
}

impl From<SandboxError> for ToolError {
    fn from(error: SandboxError) -> Self {
        match error.kind {
            SandboxErrorKind::Escape { .. } | SandboxErrorKind::SymlinkEscape { .. } => {
                Self::new(ToolErrorKind::Containment {
                    message: error.to_string(),
                })
            }
            SandboxErrorKind::Io { .. } => Self::resource(error.to_string()),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            ToolErrorKind::InvalidArguments { tool_name, reason } => {
                write!(f, "invalid arguments for '{}': {}", tool_name, reason)
            }
            ToolErrorKind::UnknownTool { name, suggestion } => {
                write!(f, "Unknown tool: {}", name)?;
                if let Some(suggestion) = suggestion {
                    write!(f, "; did you mean '{}'?", suggestion)?;
                }
                Ok(())
            }
            ToolErrorKind::Containment { message } => write!(f, "{}", message),
            ToolErrorKind::NotIndexed => {
                write!(f, "No indexed files found. Please index files first.")
            }
            ToolErrorKind::NotFound { what, path } => write!(f, "{} not found: {}", what, path),
            ToolErrorKind::Resource { reason } => write!(f, "{}", reason),
            ToolErrorKind::Timeout {
                operation,
                duration,
            } => write!(
                f,
                "{} timed out after {} seconds",
                operation,
                duration.as_secs()
            ),
            ToolErrorKind::Upstream { reason } => {
                write!(f, "external service error: {}", reason)
            }
            ToolErrorKind::Internal { message } => {
                write!(f, "internal tool error: {}", message)
            }
        }
    }
}

impl std::error::Error for ToolError {}
