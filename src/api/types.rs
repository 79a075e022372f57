//! Request and response bodies of the HTTP API.

use crate::orchestrator::TurnOutcome;
use crate::session::{SessionState, ToolRecord};
use crate::tools::builtins::list_directory::DirectoryEntry;
use crate::workspace::FileInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
    pub model: Option<String>,
}

/// Response of every conversational endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub tool_calls: Vec<ToolRecord>,
    pub session_id: String,
    pub context: Value,
    pub model_used: String,
}

impl ChatResponse {
    pub fn new(outcome: TurnOutcome, session_id: &str, state: &SessionState) -> Self {
        Self {
            response: outcome.response,
            tool_calls: outcome.tool_calls,
            session_id: session_id.to_string(),
            context: state.context_json(),
            model_used: outcome.model_used,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateCodeRequest {
    pub description: String,
    pub language: String,
    pub framework: Option<String>,
    pub session_id: Option<String>,
    pub specifications: Option<Value>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewriteCodeRequest {
    pub file_path: String,
    pub instructions: String,
    pub session_id: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeCodeRequest {
    pub file_path: String,
    pub session_id: String,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateProjectRequest {
    pub project_name: String,
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub session_id: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexRequest {
    pub session_id: String,
    pub file_paths: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCodeRequest {
    pub query: String,
    pub session_id: String,
    pub file_patterns: Option<Vec<String>>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
    pub session_id: String,
    pub working_dir: Option<String>,
    pub timeout: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CloneRequest {
    pub repository_url: String,
    pub session_id: String,
    pub directory_name: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFolderRequest {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceQuery {
    pub session_id: Option<String>,
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub file_path: String,
    pub size: u64,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceInfo {
    pub current_directory: String,
    pub available_files: Vec<FileInfo>,
    pub directories: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub context: Value,
    pub message_count: usize,
    pub tool_calls: Vec<ToolRecord>,
    pub history_tokens: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub workspace_root: String,
    pub sessions: usize,
}
