//! Model catalog and task-based model selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Preference value that skips the exact-name lookup.
pub const BEST_AVAILABLE: &str = "best_available";

/// What a request is asking the model to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    /// Free-form chat with tools
    Conversation,
    /// Writing or rewriting code
    CodeGeneration,
    /// Reading and explaining code
    CodeUnderstanding,
    /// Producing a whole project tree
    ProjectGeneration,
}

impl ModelTask {
    /// Returns the name used in `default_for` lists.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::CodeGeneration => "code_generation",
            Self::CodeUnderstanding => "code_understanding",
            Self::ProjectGeneration => "project_generation",
        }
    }
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One model the backend may route requests to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSpec {
    /// Model name as the API knows it
    pub name: String,
    /// Provider label
    pub provider: String,
    /// Free-form capability tags
    pub capabilities: Vec<String>,
    /// Human-readable description
    pub description: String,
    /// Tasks this model is the default for; `default` marks the fallback
    pub default_for: Vec<String>,
    /// Generation limit sent with each request
    pub max_tokens: u32,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            name: "llama3-70b-8192".to_string(),
            provider: "groq".to_string(),
            capabilities: vec![
                "code_generation".to_string(),
                "tool_use".to_string(),
                "fast_response".to_string(),
            ],
            description: "Fast model with good code capabilities".to_string(),
            default_for: vec!["quick_tasks".to_string(), "default".to_string()],
            max_tokens: 8192,
        }
    }
}

impl ModelSpec {
    fn is_default_for(&self, tag: &str) -> bool {
        self.default_for.iter().any(|t| t == tag)
    }
}

/// The configured models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelSpec>,
}

impl ModelCatalog {
    /// Creates a catalog. An empty list is replaced by the default model.
    #[must_use]
    pub fn new(models: Vec<ModelSpec>) -> Self {
        if models.is_empty() {
            return Self::default();
        }
        Self { models }
    }

    /// Returns every model, in configuration order.
    #[must_use]
    pub fn models(&self) -> &[ModelSpec] {
        &self.models
    }

    /// Picks a model for `task`.
    ///
    /// Tries, in order: the model named by `preference` (unless it is
    /// `best_available`), a model listing `task` in `default_for`, a model
    /// listing `default`, then the first model. An unknown preference falls
    /// through to the task-based choice.
    #[must_use]
    pub fn select(&self, task: ModelTask, preference: Option<&str>) -> &ModelSpec {
        if let Some(name) = preference.filter(|p| *p != BEST_AVAILABLE) {
            if let Some(model) = self.models.iter().find(|m| m.name == name) {
                return model;
            }
            tracing::debug!(requested = name, %task, "unknown model preference; selecting by task");
        }

        self.models
            .iter()
            .find(|m| m.is_default_for(task.as_str()))
            .or_else(|| self.models.iter().find(|m| m.is_default_for("default")))
            .unwrap_or(&self.models[0])
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: vec![ModelSpec::default()],
        }
    }
}
