//! Tool-call dispatch.
//!
//! The [`ToolDispatcher`] turns a model's tool call into a [`ToolRecord`]:
//! it resolves the tool name, parses the arguments, runs the tool inside the
//! session sandbox and records the outcome. Nothing it does can fail the
//! caller; every problem ends up as a failure outcome in the record.

use crate::config::{EmbeddingConfig, ToolsConfig};
use crate::index::EmbeddingProvider;
use crate::messages::ToolCall;
use crate::session::{ClonedRepo, SessionState, ToolRecord};
use crate::tools::builtins::{
    clone_repository, create_project, execute_command, index_files, list_directory, read_file,
    search_code, search_files, write_file,
};
use crate::tools::{ToolError, ToolInvocation, ToolKind, ToolOutcome};
use crate::workspace::WorkspaceSandbox;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Runs tool calls against a session.
#[derive(Clone)]
pub struct ToolDispatcher {
    tools: ToolsConfig,
    embedding: EmbeddingConfig,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher")
            .field("tools", &self.tools)
            .field("embedder", &self.embedder.name())
            .finish_non_exhaustive()
    }
}

impl ToolDispatcher {
    /// Creates a dispatcher with the given limits and embedding provider.
    #[must_use]
    pub fn new(
        tools: ToolsConfig,
        embedding: EmbeddingConfig,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            tools,
            embedding,
            embedder,
        }
    }

    /// Returns the tool limits in effect.
    #[must_use]
    pub fn tools_config(&self) -> &ToolsConfig {
        &self.tools
    }

    /// Runs one model-issued tool call and appends its record to the
    /// session's tool history.
    ///
    /// Unknown tools and malformed arguments produce failure records; the
    /// returned record always describes what happened.
    pub async fn dispatch(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        call: &ToolCall,
    ) -> ToolRecord {
        let Some(kind) = ToolKind::from_name(&call.name) else {
            let suggestion = ToolKind::suggest(&call.name).map(str::to_string);
            let error = ToolError::unknown_tool(&call.name, suggestion);
            return self.record_failure(state, call, &error);
        };

        match ToolInvocation::parse(kind, &call.arguments) {
            Ok(invocation) => {
                self.dispatch_invocation(state, sandbox, call.id.clone(), invocation)
                    .await
            }
            Err(error) => self.record_failure(state, call, &error),
        }
    }

    /// Runs an already-typed invocation, as the direct tool endpoints do.
    pub async fn dispatch_invocation(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        call_id: impl Into<String>,
        invocation: ToolInvocation,
    ) -> ToolRecord {
        let kind = invocation.kind();
        let arguments = invocation.arguments();

        let outcome: ToolOutcome = self.execute(state, sandbox, invocation).await.into();
        if outcome.is_success() {
            annotate(state, kind, &outcome);
        }

        let record = ToolRecord {
            call_id: call_id.into(),
            tool: kind.name().to_string(),
            arguments,
            outcome,
            executed_at: Utc::now(),
        };
        log_record(&record);
        state.tool_history.push(record.clone());
        record
    }

    async fn execute(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        invocation: ToolInvocation,
    ) -> Result<Value, ToolError> {
        match invocation {
            ToolInvocation::ReadFile(args) => read_file::run(sandbox, args).await,
            ToolInvocation::WriteFile(args) => write_file::run(sandbox, args).await,
            ToolInvocation::ListDirectory(args) => list_directory::run(sandbox, args).await,
            ToolInvocation::SearchFiles(args) => search_files::run(sandbox, args).await,
            ToolInvocation::ExecuteCommand(args) => {
                execute_command::run(sandbox, &self.tools, args).await
            }
            ToolInvocation::CreateProjectStructure(args) => create_project::run(sandbox, args).await,
            ToolInvocation::CloneRepository(args) => {
                let url = args.repository_url.clone();
                let cloned = clone_repository::run(sandbox, &self.tools, args).await?;
                let indexed = self
                    .index_clone(state, sandbox, &cloned.relative_path)
                    .await;

                state.context.cloned_repositories.push(ClonedRepo {
                    url,
                    directory: cloned.relative_path.clone(),
                    cloned_at: Utc::now(),
                });
                state.context.last_cloned_repo = Some(cloned.relative_path.clone());
                Ok(cloned.into_payload(indexed))
            }
            ToolInvocation::IndexFiles(args) => {
                index_files::run(
                    sandbox,
                    &mut state.index,
                    self.embedder.as_ref(),
                    &self.embedding,
                    args,
                )
                .await
            }
            ToolInvocation::SearchCode(args) => {
                search_code::run(&state.index, self.embedder.as_ref(), args).await
            }
        }
    }

    /// Indexes a fresh clone. A failure leaves the clone in place unindexed.
    async fn index_clone(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        relative_path: &str,
    ) -> bool {
        let args = index_files::IndexFilesArgs {
            file_paths: Some(vec![relative_path.to_string()]),
        };
        match index_files::run(
            sandbox,
            &mut state.index,
            self.embedder.as_ref(),
            &self.embedding,
            args,
        )
        .await
        {
            Ok(_) => {
                state.context.indexed_files = state.index.files();
                state.context.last_indexed = Some(Utc::now());
                true
            }
            Err(e) => {
                tracing::warn!(
                    directory = relative_path,
                    error = %e,
                    "cloned repository could not be indexed"
                );
                false
            }
        }
    }

    fn record_failure(
        &self,
        state: &mut SessionState,
        call: &ToolCall,
        error: &ToolError,
    ) -> ToolRecord {
        let arguments = serde_json::from_str(&call.arguments)
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));
        let record = ToolRecord {
            call_id: call.id.clone(),
            tool: call.name.clone(),
            arguments,
            outcome: ToolOutcome::failure(error),
            executed_at: Utc::now(),
        };
        log_record(&record);
        state.tool_history.push(record.clone());
        record
    }
}

/// Records what a successful tool call tells us about the workspace.
fn annotate(state: &mut SessionState, kind: ToolKind, outcome: &ToolOutcome) {
    let Some(payload) = outcome.payload() else {
        return;
    };
    let context = &mut state.context;
    match kind {
        ToolKind::ReadFile => {
            if let Some(path) = payload.pointer("/file_info/path") {
                context.annotate("last_read_file", path.clone());
            }
        }
        ToolKind::WriteFile => {
            if let Some(path) = payload.pointer("/file_info/path") {
                context.annotate("last_modified_file", path.clone());
            }
        }
        ToolKind::ListDirectory => {
            if let Some(path) = payload["current_path"].as_str() {
                context.current_directory = path.to_string();
            }
        }
        ToolKind::IndexFiles => {
            context.indexed_files = state.index.files();
            context.last_indexed = Some(Utc::now());
        }
        ToolKind::CreateProjectStructure => {
            state.project_structure = payload.get("structure").cloned();
        }
        ToolKind::SearchFiles
        | ToolKind::ExecuteCommand
        | ToolKind::CloneRepository
        | ToolKind::SearchCode => {}
    }
}

fn log_record(record: &ToolRecord) {
    match &record.outcome {
        ToolOutcome::Success { .. } => tracing::info!(
            tool = %record.tool,
            call_id = %record.call_id,
            "tool call succeeded"
        ),
        ToolOutcome::Failure { kind, error } => tracing::warn!(
            tool = %record.tool,
            call_id = %record.call_id,
            kind = ?kind,
            error = %error,
            "tool call failed"
        ),
    }
}
