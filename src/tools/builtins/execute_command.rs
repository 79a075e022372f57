//! `execute_command` built-in tool.
//!
//! Runs a shell command with its working directory inside the workspace.
//! A non-zero exit status is a successful tool call; the exit code and
//! output are reported to the model either way.

use crate::config::ToolsConfig;
use crate::messages::ToolDefinition;
use crate::tools::process::run_bounded;
use crate::tools::ToolError;
use crate::workspace::WorkspaceSandbox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::process::Command;

/// Arguments for the execute_command tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteCommandArgs {
    /// Shell command line
    pub command: String,
    /// Working directory, relative to the workspace (default: the root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ExecuteCommandOutput {
    success: bool,
    exit_code: i32,
    stdout: String,
    stderr: String,
    command: String,
    working_dir: String,
    truncated: bool,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "execute_command".to_string(),
        description: "Execute a shell command in the workspace and return its exit code, \
                      stdout and stderr."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The command line to run"
                },
                "working_dir": {
                    "type": "string",
                    "description": "Working directory relative to the workspace root (default: \".\")"
                },
                "timeout": {
                    "type": "integer",
                    "description": "Timeout in seconds (default: 30)",
                    "minimum": 1
                }
            },
            "required": ["command"]
        }),
    }
}

/// Runs a command inside the sandbox.
///
/// # Errors
///
/// - validation if the command is empty or the directory escapes
/// - not found if the working directory does not exist
/// - timeout if the command exceeds its budget
pub async fn run(
    sandbox: &WorkspaceSandbox,
    config: &ToolsConfig,
    args: ExecuteCommandArgs,
) -> Result<Value, ToolError> {
    if args.command.trim().is_empty() {
        return Err(ToolError::invalid_arguments(
            "execute_command",
            "command cannot be empty",
        ));
    }

    let requested_dir = args.working_dir.as_deref().unwrap_or(".");
    let cwd = sandbox.resolve(requested_dir)?;
    if !tokio::fs::metadata(&cwd).await.is_ok_and(|m| m.is_dir()) {
        return Err(ToolError::directory_not_found(requested_dir));
    }

    let limit = config.command_timeout(args.timeout);
    tracing::info!(
        command = %args.command,
        cwd = %cwd.display(),
        timeout_secs = limit.as_secs(),
        "executing command"
    );

    let mut command = shell_command(&args.command);
    command.current_dir(&cwd);

    let output = run_bounded(command, limit, config.max_output_bytes, "Command").await?;

    serde_json::to_value(ExecuteCommandOutput {
        success: output.success,
        exit_code: output.exit_code,
        stdout: output.stdout,
        stderr: output.stderr,
        command: args.command,
        working_dir: sandbox.relative(&cwd),
        truncated: output.truncated,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

#[cfg(unix)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}
