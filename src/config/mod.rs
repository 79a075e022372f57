//! Configuration management.
//!
//! Configuration is stored in TOML format. The search order is:
//! 1. `./code-workbench.toml` (project-local)
//! 2. `~/.config/code-workbench/config.toml` (XDG config)
//!
//! A missing file is not an error; every section has defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [workspace]
//! root = "/var/lib/code-workbench"
//! escape_policy = "rebase"
//!
//! [session]
//! idle_timeout_secs = 1800
//!
//! [llm]
//! base_url = "https://api.groq.com/openai/v1"
//! api_key_env = "GROQ_API_KEY"
//!
//! [embedding]
//! provider = "local"
//! ```

mod file;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use types::{
    EmbeddingBackend, EmbeddingConfig, LlmConfig, OrchestratorConfig, ServerConfig,
    SessionConfig, ToolsConfig, WorkbenchConfig, WorkspaceConfig,
};
