//! What a session remembers between requests.

use crate::index::CodeIndex;
use crate::messages::Message;
use crate::tools::ToolOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One repository cloned into the session workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClonedRepo {
    /// The URL that was cloned
    pub url: String,
    /// Clone directory, relative to the workspace root
    pub directory: String,
    /// When the clone finished
    pub cloned_at: DateTime<Utc>,
}

/// Structured facts about the workspace, shown to the model and to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    /// Absolute path of the session sandbox
    pub workspace_root: String,
    /// Directory last listed, relative to the root
    pub current_directory: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// When the session was last used
    pub last_activity: DateTime<Utc>,
    /// Files currently in the semantic index
    pub indexed_files: Vec<String>,
    /// When the index last changed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_indexed: Option<DateTime<Utc>>,
    /// Every clone performed in this session
    pub cloned_repositories: Vec<ClonedRepo>,
    /// Directory of the most recent clone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_cloned_repo: Option<String>,
    /// Free-form facts such as `last_read_file` or `last_uploaded_file`
    #[serde(flatten)]
    pub annotations: BTreeMap<String, Value>,
}

impl SessionContext {
    /// Creates the context of a fresh session rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            workspace_root: workspace_root.into(),
            current_directory: ".".to_string(),
            created_at: now,
            last_activity: now,
            indexed_files: Vec::new(),
            last_indexed: None,
            cloned_repositories: Vec::new(),
            last_cloned_repo: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Sets an annotation, replacing any previous value.
    pub fn annotate(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Appends `value` to the list annotation `key`, creating it if needed.
    pub fn append_annotation(&mut self, key: &str, value: impl Into<Value>) {
        let entry = self
            .annotations
            .entry(key.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(value.into()),
            other => *other = Value::Array(vec![other.take(), value.into()]),
        }
    }

    /// Returns an annotation's value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<&Value> {
        self.annotations.get(key)
    }
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRecord {
    /// Identifier of the originating call
    pub call_id: String,
    /// Tool name as requested
    pub tool: String,
    /// Arguments as parsed, or the raw string when parsing failed
    pub arguments: Value,
    /// What happened
    pub outcome: ToolOutcome,
    /// When the call finished
    pub executed_at: DateTime<Utc>,
}

/// Everything mutable about a session, guarded by the session lock.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Conversation history, oldest first
    pub messages: Vec<Message>,
    /// Workspace facts
    pub context: SessionContext,
    /// Executed tool calls, oldest first
    pub tool_history: Vec<ToolRecord>,
    /// Item tree from the last project creation
    pub project_structure: Option<Value>,
    /// Semantic index over workspace files
    pub index: CodeIndex,
}

impl SessionState {
    /// Creates an empty state for a workspace rooted at `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            context: SessionContext::new(workspace_root),
            tool_history: Vec::new(),
            project_structure: None,
            index: CodeIndex::new(),
        }
    }

    /// Returns the context as JSON, including the project structure.
    #[must_use]
    pub fn context_json(&self) -> Value {
        let mut value = serde_json::to_value(&self.context).unwrap_or(Value::Null);
        if let (Value::Object(map), Some(structure)) = (&mut value, &self.project_structure) {
            map.insert("project_structure".to_string(), structure.clone());
        }
        value
    }
}
