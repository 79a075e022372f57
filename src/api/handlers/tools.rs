use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use super::helpers::{outcome_response, require_non_empty, session_error, ApiResult};
use crate::api::types::{CloneRequest, ExecuteRequest, IndexRequest, SearchCodeRequest};
use crate::api::ServerState;
use crate::messages::{Message, ToolDefinition};
use crate::session::ToolRecord;
use crate::tools::builtins::{
    clone_repository::CloneRepositoryArgs, execute_command::ExecuteCommandArgs,
    index_files::IndexFilesArgs, search_code::SearchCodeArgs,
};
use crate::tools::{all_definitions, ToolInvocation};
use crate::types::ToolCallId;

const DEFAULT_MAX_RESULTS: usize = 5;

/// Runs one invocation in a session and returns its record.
async fn run_in_session(
    state: &ServerState,
    session_id: &str,
    invocation: ToolInvocation,
    commit: impl FnOnce(&ToolRecord) -> Vec<Message>,
) -> ApiResult<ToolRecord> {
    let session = state
        .sessions
        .get_or_create(Some(session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let record = state
        .orchestrator
        .dispatcher()
        .dispatch_invocation(
            &mut session_state,
            session.sandbox(),
            ToolCallId::new().to_string(),
            invocation,
        )
        .await;
    if record.outcome.is_success() {
        let messages = commit(&record);
        session_state.messages.extend(messages);
    }
    Ok(record)
}

pub async fn handle_index(
    State(state): State<ServerState>,
    Json(req): Json<IndexRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let invocation = ToolInvocation::IndexFiles(IndexFilesArgs {
        file_paths: req.file_paths,
    });
    let record = run_in_session(&state, &req.session_id, invocation, |_| Vec::new()).await?;
    Ok(outcome_response(&record))
}

pub async fn handle_search_code(
    State(state): State<ServerState>,
    Json(req): Json<SearchCodeRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_non_empty(&req.query, "query")?;
    let query = req.query.clone();
    let invocation = ToolInvocation::SearchCode(SearchCodeArgs {
        query: req.query,
        top_k: req.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
        file_patterns: req.file_patterns,
    });
    let record = run_in_session(&state, &req.session_id, invocation, |record| {
        let results = record
            .outcome
            .payload()
            .map(|p| p["results"].to_string())
            .unwrap_or_default();
        vec![
            Message::user(format!("Searched for code: {query}")),
            Message::assistant(results),
        ]
    })
    .await?;
    Ok(outcome_response(&record))
}

pub async fn handle_execute(
    State(state): State<ServerState>,
    Json(req): Json<ExecuteRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let invocation = ToolInvocation::ExecuteCommand(ExecuteCommandArgs {
        command: req.command,
        working_dir: req.working_dir,
        timeout: req.timeout,
    });
    let record = run_in_session(&state, &req.session_id, invocation, |_| Vec::new()).await?;
    Ok(outcome_response(&record))
}

pub async fn handle_clone(
    State(state): State<ServerState>,
    Json(req): Json<CloneRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let invocation = ToolInvocation::CloneRepository(CloneRepositoryArgs {
        repository_url: req.repository_url,
        directory_name: req.directory_name,
        branch: req.branch,
    });
    let record = run_in_session(&state, &req.session_id, invocation, |_| Vec::new()).await?;
    Ok(outcome_response(&record))
}

pub async fn handle_list_tools() -> Json<Vec<ToolDefinition>> {
    Json(all_definitions())
}
