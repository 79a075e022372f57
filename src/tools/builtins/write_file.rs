//! `write_file` built-in tool.
//!
//! Creates or overwrites a file, creating missing parent directories.

use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::{file_info, FileInfo, WorkspaceSandbox};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Arguments for the write_file tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFileArgs {
    /// Path of the file, relative to the workspace
    #[serde(alias = "path")]
    pub file_path: String,
    /// Full content to write
    pub content: String,
}

#[derive(Debug, Serialize)]
struct WriteFileOutput {
    message: String,
    file_info: FileInfo,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "write_file".to_string(),
        description: "Write content to a file in the workspace. Creates the file and any \
                      missing parent directories, or replaces an existing file."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_path": {
                    "type": "string",
                    "description": "Path to the file, relative to the workspace root"
                },
                "content": {
                    "type": "string",
                    "description": "The complete content to write"
                }
            },
            "required": ["file_path", "content"]
        }),
    }
}

/// Writes a file inside the sandbox.
///
/// # Errors
///
/// - resource if the target is a directory or the write fails
/// - validation if the path escapes the sandbox
pub async fn run(sandbox: &WorkspaceSandbox, args: WriteFileArgs) -> Result<Value, ToolError> {
    let path = sandbox.resolve(&args.file_path)?;
    if sandbox.is_root(&path) || tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_dir()) {
        return Err(ToolError::resource(format!(
            "Path is a directory, not a file: {}",
            args.file_path
        )));
    }

    sandbox.ensure_parent(&path).await?;
    tokio::fs::write(&path, args.content.as_bytes())
        .await
        .map_err(|e| ToolError::resource(format!("failed to write file: {e}")))?;

    let info = file_info(sandbox, &path).await?;
    tracing::debug!(path = %info.path, size = info.size, "file written");

    serde_json::to_value(WriteFileOutput {
        message: format!("Successfully wrote to {}", info.path),
        file_info: info,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::testing;
    use crate::tools::ToolErrorCategory;

    #[tokio::test]
    async fn creates_parent_directories() {
        let (_dir, sandbox) = testing::sandbox().await;

        let result = run(
            &sandbox,
            WriteFileArgs {
                file_path: "src/pkg/util.py".into(),
                content: "x = 1\n".into(),
            },
        )
        .await
        .unwrap();

        let written = tokio::fs::read_to_string(sandbox.root().join("src/pkg/util.py"))
            .await
            .unwrap();
        assert_eq!(written, "x = 1\n");
        assert_eq!(result["message"], "Successfully wrote to src/pkg/util.py");
        assert_eq!(result["file_info"]["size"], 6);
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let (_dir, sandbox) = testing::sandbox().await;
        tokio::fs::write(sandbox.root().join("a.txt"), "old content")
            .await
            .unwrap();

        run(
            &sandbox,
            WriteFileArgs {
                file_path: "a.txt".into(),
                content: "new".into(),
            },
        )
        .await
        .unwrap();

        let written = tokio::fs::read_to_string(sandbox.root().join("a.txt"))
            .await
            .unwrap();
        assert_eq!(written, "new");
    }

    #[tokio::test]
    async fn absolute_outside_path_lands_inside() {
        let (dir, sandbox) = testing::sandbox().await;

        run(
            &sandbox,
            WriteFileArgs {
                file_path: dir.path().join("outside.txt").display().to_string(),
                content: "x".into(),
            },
        )
        .await
        .unwrap();

        assert!(!dir.path().join("outside.txt").exists());
    }

    #[tokio::test]
    async fn writing_over_directory_fails() {
        let (_dir, sandbox) = testing::sandbox().await;
        tokio::fs::create_dir(sandbox.root().join("src")).await.unwrap();

        let error = run(
            &sandbox,
            WriteFileArgs {
                file_path: "src".into(),
                content: "x".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Resource);
    }
}
