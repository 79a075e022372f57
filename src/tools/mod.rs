//! Tool registry.
//!
//! The set of tools is closed: [`ToolKind`] enumerates them, and a model's
//! tool call becomes a [`ToolInvocation`] (kind plus typed arguments)
//! before anything runs. Results are reported as a [`ToolOutcome`], never
//! as a raised error.
//!
//! ## Tools
//!
//! | Name | Effect |
//! |------|--------|
//! | `read_file` | Read a file's text |
//! | `write_file` | Create or replace a file |
//! | `list_directory` | List a directory |
//! | `search_files` | Find files by name regex |
//! | `execute_command` | Run a shell command in the workspace |
//! | `create_project_structure` | Materialize a nested file tree |
//! | `clone_repository` | `git clone` into the workspace |
//! | `index_files` | Embed files for semantic search |
//! | `search_code` | Query the semantic index |
//!
//! ## Example
//!
//! ```rust
//! use code_workbench::tools::{ToolInvocation, ToolKind};
//!
//! let kind = ToolKind::from_name("read_file").unwrap();
//! let invocation = ToolInvocation::parse(kind, r#"{"file_path":"main.py"}"#).unwrap();
//! assert_eq!(invocation.kind(), ToolKind::ReadFile);
//! ```

pub mod builtins;
mod definition;
mod error;
mod invocation;
mod outcome;
pub mod process;

pub use definition::{all_definitions, ToolKind};
pub use error::{ToolError, ToolErrorCategory, ToolErrorKind};
pub use invocation::ToolInvocation;
pub use outcome::ToolOutcome;
