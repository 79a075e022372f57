//! The closed set of tools.
//!
//! `ToolKind` names every tool the dispatcher can run. Adding a variant
//! forces every `match` over tool kinds to be updated.

use crate::messages::ToolDefinition;
use crate::tools::builtins;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum Jaro-Winkler similarity for a "did you mean" suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Every tool the registry exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    /// Read a file's content
    ReadFile,
    /// Write content to a file
    WriteFile,
    /// List files and subdirectories
    ListDirectory,
    /// Find files whose names match a regex
    SearchFiles,
    /// Run a shell command
    ExecuteCommand,
    /// Materialize a nested file tree
    CreateProjectStructure,
    /// Clone a git repository
    CloneRepository,
    /// Chunk and embed workspace files
    IndexFiles,
    /// Rank indexed chunks against a query
    SearchCode,
}

impl ToolKind {
    /// All tools, in the order they are offered to the model.
    pub const ALL: [ToolKind; 9] = [
        ToolKind::ReadFile,
        ToolKind::WriteFile,
        ToolKind::ListDirectory,
        ToolKind::SearchFiles,
        ToolKind::ExecuteCommand,
        ToolKind::CreateProjectStructure,
        ToolKind::CloneRepository,
        ToolKind::IndexFiles,
        ToolKind::SearchCode,
    ];

    /// Returns the canonical wire name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::WriteFile => "write_file",
            Self::ListDirectory => "list_directory",
            Self::SearchFiles => "search_files",
            Self::ExecuteCommand => "execute_command",
            Self::CreateProjectStructure => "create_project_structure",
            Self::CloneRepository => "clone_repository",
            Self::IndexFiles => "index_files",
            Self::SearchCode => "search_code",
        }
    }

    /// Looks up a tool by canonical name or legacy alias.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "read_file" => Self::ReadFile,
            "write_file" => Self::WriteFile,
            "list_directory" => Self::ListDirectory,
            "search_files" => Self::SearchFiles,
            "execute_command" => Self::ExecuteCommand,
            "create_project_structure" => Self::CreateProjectStructure,
            "clone_repository" | "clone_github_repository" => Self::CloneRepository,
            "index_files" | "index_workspace_files" => Self::IndexFiles,
            "search_code" | "search_code_semantic" => Self::SearchCode,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the closest canonical tool name to an unknown name.
    #[must_use]
    pub fn suggest(name: &str) -> Option<&'static str> {
        Self::ALL
            .iter()
            .map(|kind| (kind.name(), strsim::jaro_winkler(name, kind.name())))
            .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| name)
    }

    /// Returns the schema offered to the model for this tool.
    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        match self {
            Self::ReadFile => builtins::read_file::definition(),
            Self::WriteFile => builtins::write_file::definition(),
            Self::ListDirectory => builtins::list_directory::definition(),
            Self::SearchFiles => builtins::search_files::definition(),
            Self::ExecuteCommand => builtins::execute_command::definition(),
            Self::CreateProjectStructure => builtins::create_project::definition(),
            Self::CloneRepository => builtins::clone_repository::definition(),
            Self::IndexFiles => builtins::index_files::definition(),
            Self::SearchCode => builtins::search_code::definition(),
        }
    }

    /// Returns true if this tool only reads the workspace.
    #[must_use]
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Self::ReadFile | Self::ListDirectory | Self::SearchFiles | Self::SearchCode
        )
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the definitions of every tool.
#[must_use]
pub fn all_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(|kind| kind.definition()).collect()
}
