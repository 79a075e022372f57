//! `read_file` built-in tool.
//!
//! Returns a file's text together with its detected language and metadata.
//! Binary files are reported with a marker instead of their bytes.

use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::{detect_language, file_info, FileInfo, WorkspaceSandbox};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Arguments for the read_file tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadFileArgs {
    /// Path of the file, relative to the workspace
    #[serde(alias = "path")]
    pub file_path: String,
}

/// Result of reading a file.
#[derive(Debug, Serialize)]
struct ReadFileOutput {
    content: String,
    language: &'static str,
    is_binary: bool,
    file_info: FileInfo,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_file".to_string(),
        description: "Read the content of a file in the workspace.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace root"
                }
            },
            "required": ["file_path"]
        }),
    }
}

/// Reads a file inside the sandbox.
///
/// # Errors
///
/// - not found if the path does not exist
/// - resource if it is a directory or cannot be read
/// - validation if the path escapes the sandbox
pub async fn run(sandbox: &WorkspaceSandbox, args: ReadFileArgs) -> Result<Value, ToolError> {
    let path = sandbox.resolve(&args.file_path)?;

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::not_found(&args.file_path));
        }
        Err(e) => return Err(ToolError::resource(format!("failed to read file: {e}"))),
    };
    if metadata.is_dir() {
        return Err(ToolError::resource(format!(
            "Path is a directory, not a file: {}",
            args.file_path
        )));
    }

    let info = file_info(sandbox, &path).await?;
    let language = detect_language(&path);

    let content = if info.is_binary {
        None
    } else {
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::resource(format!("failed to read file: {e}")))?;
        String::from_utf8(bytes).ok()
    };

    let output = match content {
        Some(content) => ReadFileOutput {
            content,
            language,
            is_binary: false,
            file_info: info,
        },
        None => ReadFileOutput {
            content: format!("[Binary file: {}]", info.name),
            language,
            is_binary: true,
            file_info: FileInfo {
                is_binary: true,
                ..info
            },
        },
    };

    serde_json::to_value(output).map_err(|e| ToolError::internal(e.to_string()))
}
