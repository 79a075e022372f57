//! Built-in tool implementations.
//!
//! Each submodule owns one tool: its argument struct, the schema offered
//! to the model and a `run` function. Every `run` takes the session's
//! [`WorkspaceSandbox`](crate::workspace::WorkspaceSandbox) and resolves
//! path arguments through it before touching the filesystem.

pub mod clone_repository;
pub mod create_project;
pub mod execute_command;
pub mod index_files;
pub mod list_directory;
pub mod read_file;
pub mod search_code;
pub mod search_files;
pub mod write_file;

/// Default for optional `directory` arguments.
pub(crate) fn current_dir() -> String {
    ".".to_string()
}
