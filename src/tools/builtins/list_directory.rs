//! `list_directory` built-in tool.
//!
//! Lists the immediate children of a directory, split into directories and
//! files. Symlinks that point outside the workspace are left out.

use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::{file_info, FileInfo, WorkspaceSandbox};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// Arguments for the list_directory tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDirectoryArgs {
    /// Directory to list, relative to the workspace
    #[serde(default = "super::current_dir", alias = "path")]
    pub directory: String,
}

impl Default for ListDirectoryArgs {
    fn default() -> Self {
        Self {
            directory: super::current_dir(),
        }
    }
}

/// A subdirectory entry.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    /// Directory name
    pub name: String,
    /// Path relative to the workspace root
    pub path: String,
    /// Last modification time (RFC 3339)
    pub modified: Option<String>,
}

/// Result of listing a directory.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListing {
    /// Subdirectories, sorted by name
    pub directories: Vec<DirectoryEntry>,
    /// Files, sorted by name
    pub files: Vec<FileInfo>,
    /// The listed directory, relative to the workspace root
    pub current_path: String,
    /// The parent directory, or `None` at the workspace root
    pub parent_directory: Option<String>,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "list_directory".to_string(),
        description: "List the files and subdirectories of a directory in the workspace."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "directory": {
                    "type": "string",
                    "description": "Directory to list, relative to the workspace root (default: \".\")"
                }
            }
        }),
    }
}

/// Lists a directory inside the sandbox.
///
/// # Errors
///
/// - not found if the directory does not exist
/// - resource if the path is a file or cannot be read
pub async fn run(sandbox: &WorkspaceSandbox, args: ListDirectoryArgs) -> Result<Value, ToolError> {
    let listing = list(sandbox, &args.directory).await?;
    serde_json::to_value(listing).map_err(|e| ToolError::internal(e.to_string()))
}

/// Builds the typed listing for `directory`.
///
/// # Errors
///
/// See [`run`].
pub async fn list(sandbox: &WorkspaceSandbox, directory: &str) -> Result<DirectoryListing, ToolError> {
    let path = sandbox.resolve(directory)?;

    match tokio::fs::metadata(&path).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(ToolError::resource(format!(
                "Not a directory: {directory}"
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::directory_not_found(directory));
        }
        Err(e) => return Err(ToolError::resource(format!("failed to read directory: {e}"))),
    }

    let mut entries = tokio::fs::read_dir(&path)
        .await
        .map_err(|e| ToolError::resource(format!("failed to read directory: {e}")))?;

    let mut directories = Vec::new();
    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ToolError::resource(format!("failed to read directory: {e}")))?
    {
        let entry_path = entry.path();
        let Ok(file_type) = entry.file_type().await else {
            continue;
        };
        if file_type.is_symlink() && sandbox.resolve(&entry_path).is_err() {
            tracing::debug!(path = %entry_path.display(), "skipping symlink leaving workspace");
            continue;
        }
        let Ok(metadata) = tokio::fs::metadata(&entry_path).await else {
            continue;
        };

        if metadata.is_dir() {
            directories.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: sandbox.relative(&entry_path),
                modified: metadata.modified().ok().map(crate::workspace::rfc3339),
            });
        } else if let Ok(info) = file_info(sandbox, &entry_path).await {
            files.push(info);
        }
    }

    directories.sort_by(|a, b| a.name.cmp(&b.name));
    files.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(DirectoryListing {
        directories,
        files,
        current_path: sandbox.relative(&path),
        parent_directory: parent_of(sandbox, &path),
    })
}

fn parent_of(sandbox: &WorkspaceSandbox, path: &Path) -> Option<String> {
    if sandbox.is_root(path) {
        return None;
    }
    path.parent().map(|parent| sandbox.relative(parent))
}
