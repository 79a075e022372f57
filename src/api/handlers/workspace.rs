use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
    Json,
};

use super::helpers::{bad_request, not_found, session_error, tool_error, ApiResult};
use crate::api::types::{ActionResponse, HealthResponse, SessionSummary, WorkspaceInfo, WorkspaceQuery};
use crate::api::ServerState;
use crate::llm::history_tokens;
use crate::tools::builtins::list_directory;
use crate::types::SessionId;

async fn workspace_listing(
    state: &ServerState,
    session_id: Option<&str>,
    directory: Option<&str>,
) -> ApiResult<Json<WorkspaceInfo>> {
    let session = state
        .sessions
        .get_or_create(session_id)
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let listing = list_directory::list(session.sandbox(), directory.unwrap_or("."))
        .await
        .map_err(tool_error)?;
    session_state.context.current_directory = listing.current_path.clone();

    Ok(Json(WorkspaceInfo {
        current_directory: listing.current_path,
        available_files: listing.files,
        directories: listing.directories,
    }))
}

pub async fn handle_workspace_info(
    State(state): State<ServerState>,
    Query(query): Query<WorkspaceQuery>,
) -> ApiResult<Json<WorkspaceInfo>> {
    workspace_listing(&state, query.session_id.as_deref(), query.directory.as_deref()).await
}

pub async fn handle_workspace(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    Query(query): Query<WorkspaceQuery>,
) -> ApiResult<Json<WorkspaceInfo>> {
    workspace_listing(&state, Some(&session_id), query.directory.as_deref()).await
}

fn parse_session_id(raw: &str) -> ApiResult<SessionId> {
    SessionId::parse(raw).map_err(|e| bad_request(e.to_string()))
}

pub async fn handle_get_session(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionSummary>> {
    let id = parse_session_id(&session_id)?;
    let session = state
        .sessions
        .get(&id)
        .await
        .ok_or_else(|| not_found(format!("Session not found: {id}")))?;
    let session_state = session.lock().await;

    Ok(Json(SessionSummary {
        session_id: id.to_string(),
        context: session_state.context_json(),
        message_count: session_state.messages.len(),
        tool_calls: session_state.tool_history.clone(),
        history_tokens: history_tokens(&session_state.messages),
    }))
}

pub async fn handle_delete_session(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<ActionResponse>> {
    let id = parse_session_id(&session_id)?;
    if !state.sessions.evict(&id).await {
        return Err(not_found(format!("Session not found: {id}")));
    }
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Session {id} ended"),
        path: None,
    }))
}

pub async fn handle_health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        workspace_root: state.workspace_root.display().to_string(),
        sessions: state.sessions.len().await,
    })
}

pub async fn handle_ws(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(echo)
}

async fn echo(mut socket: WebSocket) {
    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(WsMessage::Text(text)) => text,
            Ok(WsMessage::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };
        let reply = WsMessage::Text(format!("Message text was: {text}"));
        if socket.send(reply).await.is_err() {
            break;
        }
    }
    tracing::debug!("websocket closed");
}
