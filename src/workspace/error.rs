//! Sandbox error types.

use std::fmt;
use std::path::PathBuf;

/// Errors raised while resolving or provisioning a sandbox path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxError {
    /// The specific error that occurred
    pub kind: SandboxErrorKind,
}

/// Specific sandbox error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxErrorKind {
    /// The path would resolve outside the sandbox and the policy rejects it
    Escape {
        /// The path as supplied
        path: PathBuf,
    },
    /// A symlink inside the sandbox points outside of it
    SymlinkEscape {
        /// The resolved path whose ancestor leaves the sandbox
        path: PathBuf,
    },
    /// A filesystem operation on the sandbox failed
    Io {
        /// The path being operated on
        path: PathBuf,
        /// The underlying error
        reason: String,
    },
}

impl SandboxError {
    /// Creates a new SandboxError with the given kind.
    #[must_use]
    pub fn new(kind: SandboxErrorKind) -> Self {
        Self { kind }
    }

    /// Creates an escape error.
    #[must_use]
    pub fn escape(path: impl Into<PathBuf>) -> Self {
        Self::new(SandboxErrorKind::Escape { path: path.into() })
    }

    /// Creates a symlink escape error.
    #[must_use]
    pub fn symlink_escape(path: impl Into<PathBuf>) -> Self {
        Self::new(SandboxErrorKind::SymlinkEscape { path: path.into() })
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::new(SandboxErrorKind::Io {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Returns true if this error is a containment violation.
    #[must_use]
    pub fn is_escape(&self) -> bool {
        matches!(
            self.kind,
            SandboxErrorKind::Escape { .. } | SandboxErrorKind::SymlinkEscape { .. }
        )
    }
}

impl fmt::Display for SandboxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SandboxErrorKind::Escape { path } => write!(
                f,
                "path '{}' is outside the session workspace; use a path relative to the workspace root",
                path.display()
            ),
            SandboxErrorKind::SymlinkEscape { path } => write!(
                f,
                "path '{}' passes through a symlink that leaves the session workspace",
                path.display()
            ),
            SandboxErrorKind::Io { path, reason } => {
                write!(f, "filesystem error at '{}': {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for SandboxError {}
