//! Configuration types.
//!
//! Every section has working defaults, so an empty file (or no file at all)
//! yields a runnable configuration.

use crate::llm::ModelSpec;
use crate::logging::LoggingConfig;
use crate::workspace::EscapePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
///
/// ```toml
/// [server]
/// port = 8000
///
/// [workspace]
/// root = "./workspace"
/// escape_policy = "reject"
///
/// [orchestrator]
/// max_tool_rounds = 3
///
/// [[llm.models]]
/// name = "llama3-70b-8192"
/// provider = "groq"
/// capabilities = ["code_generation", "tool_use"]
/// default_for = ["default"]
/// max_tokens = 8192
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Workspace root and containment policy
    pub workspace: WorkspaceConfig,
    /// Session lifetime settings
    pub session: SessionConfig,
    /// Tool limits
    pub tools: ToolsConfig,
    /// Chat-completion API settings and model catalog
    pub llm: LlmConfig,
    /// Conversation loop settings
    pub orchestrator: OrchestratorConfig,
    /// Embedding service and chunking settings
    pub embedding: EmbeddingConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// Returns `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Workspace root and containment policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Directory under which each session gets `<root>/<session_id>`
    pub root: PathBuf,
    /// What to do with paths that would leave a session sandbox
    pub escape_policy: EscapePolicy,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("workspace"),
            escape_policy: EscapePolicy::default(),
        }
    }
}

/// Session lifetime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle for longer than this are evicted
    pub idle_timeout_secs: u64,
    /// How often the reaper sweeps
    pub reap_interval_secs: u64,
    /// Delete the sandbox directory when a session is evicted
    pub remove_workspace_on_evict: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            reap_interval_secs: 60,
            remove_workspace_on_evict: false,
        }
    }
}

impl SessionConfig {
    /// Returns the idle timeout as a Duration.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Returns the reap interval as a Duration.
    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }
}

/// Limits applied by the built-in tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Default `execute_command` timeout
    pub command_timeout_secs: u64,
    /// Upper bound for a caller-supplied command timeout
    pub max_command_timeout_secs: u64,
    /// Timeout for `git clone`
    pub clone_timeout_secs: u64,
    /// URL prefixes `clone_repository` accepts
    pub allowed_clone_prefixes: Vec<String>,
    /// Per-stream cap on captured subprocess output
    pub max_output_bytes: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: 30,
            max_command_timeout_secs: 600,
            clone_timeout_secs: 120,
            allowed_clone_prefixes: vec![
                "https://github.com/".to_string(),
                "git@github.com:".to_string(),
            ],
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl ToolsConfig {
    /// Returns the effective command timeout for an optional request value.
    #[must_use]
    pub fn command_timeout(&self, requested_secs: Option<u64>) -> Duration {
        let secs = requested_secs
            .unwrap_or(self.command_timeout_secs)
            .clamp(1, self.max_command_timeout_secs.max(1));
        Duration::from_secs(secs)
    }

    /// Returns the clone timeout as a Duration.
    #[must_use]
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }
}

/// Chat-completion API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of the OpenAI-compatible API
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Direct API key value (discouraged - use api_key_env instead)
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// System prompt prepended to every chat turn
    pub system_prompt: String,
    /// Model catalog used for task-based selection
    pub models: Vec<ModelSpec>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: Some("GROQ_API_KEY".to_string()),
            api_key: None,
            timeout_secs: 120,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            models: vec![ModelSpec::default()],
        }
    }
}

impl LlmConfig {
    /// Resolves the API key from the direct value or the environment.
    ///
    /// Returns an empty string when neither is set; local providers do not
    /// need a key.
    #[must_use]
    pub fn resolve_api_key(&self) -> String {
        if let Some(ref key) = self.api_key {
            return key.clone();
        }
        self.api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .unwrap_or_default()
    }

    /// Returns the request timeout as a Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI code assistant that can read, write and \
analyze code in the user's workspace. Use the available tools to inspect files, run commands, \
search the codebase and make changes. After performing tool operations, summarize what you did \
and what you found. Always respond in Markdown.";

/// Conversation loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum tool rounds per chat turn
    pub max_tool_rounds: usize,
    /// Temperature for chat and generation
    pub chat_temperature: f32,
    /// Temperature for rewrite and analysis
    pub edit_temperature: f32,
    /// Token budget for replayed history; oldest turns are dropped from the prompt beyond it
    pub max_history_tokens: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: 1,
            chat_temperature: 0.7,
            edit_temperature: 0.3,
            max_history_tokens: 6000,
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint, falling back to local without a key
    #[default]
    Openai,
    /// Deterministic offline hashing embeddings
    Local,
}

/// Embedding service and chunking settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding backend
    pub provider: EmbeddingBackend,
    /// Base URL of the embeddings API
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Vector size for the local provider
    pub dimensions: usize,
    /// Characters per chunk
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks
    pub chunk_overlap: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::default(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            dimensions: 384,
            chunk_size: 1000,
            chunk_overlap: 200,
            timeout_secs: 60,
        }
    }
}
