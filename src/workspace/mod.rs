//! Per-session workspace sandbox.
//!
//! Every session owns one directory. All file paths supplied by tool
//! arguments are resolved through [`WorkspaceSandbox::resolve`], which
//! guarantees the result lies inside that directory.

mod error;
mod files;
mod sandbox;

pub use error::{SandboxError, SandboxErrorKind};
pub use files::{detect_language, file_info, is_binary_bytes, is_binary_file, FileInfo};
pub use sandbox::{EscapePolicy, WorkspaceSandbox};
pub(crate) use files::rfc3339;
