//! Typed tool invocations.
//!
//! A `ToolInvocation` is a tool kind paired with its already-validated
//! arguments. Raw model output goes in through [`ToolInvocation::parse`];
//! everything past that point works with typed structs.

use crate::tools::builtins::{
    clone_repository::CloneRepositoryArgs, create_project::CreateProjectArgs,
    execute_command::ExecuteCommandArgs, index_files::IndexFilesArgs,
    list_directory::ListDirectoryArgs, read_file::ReadFileArgs, search_code::SearchCodeArgs,
    search_files::SearchFilesArgs, write_file::WriteFileArgs,
};
use crate::tools::{ToolError, ToolKind};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One tool call with validated arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    /// `read_file`
    ReadFile(ReadFileArgs),
    /// `write_file`
    WriteFile(WriteFileArgs),
    /// `list_directory`
    ListDirectory(ListDirectoryArgs),
    /// `search_files`
    SearchFiles(SearchFilesArgs),
    /// `execute_command`
    ExecuteCommand(ExecuteCommandArgs),
    /// `create_project_structure`
    CreateProjectStructure(CreateProjectArgs),
    /// `clone_repository`
    CloneRepository(CloneRepositoryArgs),
    /// `index_files`
    IndexFiles(IndexFilesArgs),
    /// `search_code`
    SearchCode(SearchCodeArgs),
}

impl ToolInvocation {
    /// Parses the JSON argument string a model emitted for `kind`.
    ///
    /// An empty or whitespace-only string is treated as `{}`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-arguments error if the text is not JSON or does
    /// not match the tool's argument shape.
    pub fn parse(kind: ToolKind, raw_arguments: &str) -> Result<Self, ToolError> {
        let value = if raw_arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw_arguments).map_err(|e| {
                ToolError::invalid_arguments(
                    kind.name(),
                    format!("arguments are not valid JSON: {e}"),
                )
            })?
        };
        Self::from_value(kind, value)
    }

    /// Builds an invocation from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns an invalid-arguments error if the value does not match the
    /// tool's argument shape.
    pub fn from_value(kind: ToolKind, value: Value) -> Result<Self, ToolError> {
        let invocation = match kind {
            ToolKind::ReadFile => Self::ReadFile(decode(kind, value)?),
            ToolKind::WriteFile => Self::WriteFile(decode(kind, value)?),
            ToolKind::ListDirectory => Self::ListDirectory(decode(kind, value)?),
            ToolKind::SearchFiles => Self::SearchFiles(decode(kind, value)?),
            ToolKind::ExecuteCommand => Self::ExecuteCommand(decode(kind, value)?),
            ToolKind::CreateProjectStructure => {
                Self::CreateProjectStructure(decode(kind, value)?)
            }
            ToolKind::CloneRepository => Self::CloneRepository(decode(kind, value)?),
            ToolKind::IndexFiles => Self::IndexFiles(decode(kind, value)?),
            ToolKind::SearchCode => Self::SearchCode(decode(kind, value)?),
        };
        Ok(invocation)
    }

    /// Returns the kind of tool this invocation runs.
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        match self {
            Self::ReadFile(_) => ToolKind::ReadFile,
            Self::WriteFile(_) => ToolKind::WriteFile,
            Self::ListDirectory(_) => ToolKind::ListDirectory,
            Self::SearchFiles(_) => ToolKind::SearchFiles,
            Self::ExecuteCommand(_) => ToolKind::ExecuteCommand,
            Self::CreateProjectStructure(_) => ToolKind::CreateProjectStructure,
            Self::CloneRepository(_) => ToolKind::CloneRepository,
            Self::IndexFiles(_) => ToolKind::IndexFiles,
            Self::SearchCode(_) => ToolKind::SearchCode,
        }
    }

    /// Returns the arguments as JSON, for the tool history.
    #[must_use]
    pub fn arguments(&self) -> Value {
        match self {
            Self::ReadFile(args) => encode(args),
            Self::WriteFile(args) => encode(args),
            Self::ListDirectory(args) => encode(args),
            Self::SearchFiles(args) => encode(args),
            Self::ExecuteCommand(args) => encode(args),
            Self::CreateProjectStructure(args) => encode(args),
            Self::CloneRepository(args) => encode(args),
            Self::IndexFiles(args) => encode(args),
            Self::SearchCode(args) => encode(args),
        }
    }
}

fn decode<T: DeserializeOwned>(kind: ToolKind, value: Value) -> Result<T, ToolError> {
    serde_json::from_value(value).map_err(|e| ToolError::invalid_arguments(kind.name(), e.to_string()))
}

fn encode<T: Serialize>(args: &T) -> Value {
    serde_json::to_value(args).unwrap_or(Value::Null)
}
