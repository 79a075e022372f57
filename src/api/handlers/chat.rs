use axum::{extract::State, Json};

use super::helpers::{orchestrator_error, require_non_empty, session_error, ApiResult};
use crate::api::types::{
    AnalyzeCodeRequest, ChatRequest, ChatResponse, GenerateCodeRequest, GenerateProjectRequest,
    RewriteCodeRequest,
};
use crate::api::ServerState;
use crate::orchestrator::{CodeRequest, ProjectRequest};

pub async fn handle_chat(
    State(state): State<ServerState>,
    Json(req): Json<ChatRequest>,
) -> ApiResult<Json<ChatResponse>> {
    require_non_empty(&req.message, "message")?;
    let session = state
        .sessions
        .get_or_create(req.session_id.as_deref())
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    tracing::info!(session_id = %session.id(), "chat request");
    let outcome = state
        .orchestrator
        .chat_turn(
            &mut session_state,
            session.sandbox(),
            &req.message,
            req.model.as_deref(),
        )
        .await
        .map_err(orchestrator_error)?;

    Ok(Json(ChatResponse::new(
        outcome,
        session.id().as_str(),
        &session_state,
    )))
}

pub async fn handle_generate_code(
    State(state): State<ServerState>,
    Json(req): Json<GenerateCodeRequest>,
) -> ApiResult<Json<ChatResponse>> {
    require_non_empty(&req.description, "description")?;
    let session = state
        .sessions
        .get_or_create(req.session_id.as_deref())
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let request = CodeRequest {
        description: req.description,
        language: req.language,
        framework: req.framework,
        specifications: req.specifications,
    };
    let outcome = state
        .orchestrator
        .generate_code(&mut session_state, &request, req.model.as_deref())
        .await
        .map_err(orchestrator_error)?;

    Ok(Json(ChatResponse::new(
        outcome,
        session.id().as_str(),
        &session_state,
    )))
}

pub async fn handle_rewrite_code(
    State(state): State<ServerState>,
    Json(req): Json<RewriteCodeRequest>,
) -> ApiResult<Json<ChatResponse>> {
    require_non_empty(&req.file_path, "file_path")?;
    require_non_empty(&req.instructions, "instructions")?;
    let session = state
        .sessions
        .get_or_create(Some(&req.session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let outcome = state
        .orchestrator
        .rewrite_file(
            &mut session_state,
            session.sandbox(),
            &req.file_path,
            &req.instructions,
            req.model.as_deref(),
        )
        .await
        .map_err(orchestrator_error)?;

    Ok(Json(ChatResponse::new(
        outcome,
        session.id().as_str(),
        &session_state,
    )))
}

pub async fn handle_analyze_code(
    State(state): State<ServerState>,
    Json(req): Json<AnalyzeCodeRequest>,
) -> ApiResult<Json<ChatResponse>> {
    require_non_empty(&req.file_path, "file_path")?;
    let session = state
        .sessions
        .get_or_create(Some(&req.session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let outcome = state
        .orchestrator
        .analyze_code(
            &mut session_state,
            session.sandbox(),
            &req.file_path,
            req.model.as_deref(),
        )
        .await
        .map_err(orchestrator_error)?;

    Ok(Json(ChatResponse::new(
        outcome,
        session.id().as_str(),
        &session_state,
    )))
}

pub async fn handle_generate_project(
    State(state): State<ServerState>,
    Json(req): Json<GenerateProjectRequest>,
) -> ApiResult<Json<ChatResponse>> {
    require_non_empty(&req.project_name, "project_name")?;
    let session = state
        .sessions
        .get_or_create(req.session_id.as_deref())
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let request = ProjectRequest {
        project_name: req.project_name,
        description: req.description,
        technologies: req.technologies,
        features: req.features,
    };
    let outcome = state
        .orchestrator
        .generate_project(
            &mut session_state,
            session.sandbox(),
            &request,
            req.model.as_deref(),
        )
        .await
        .map_err(orchestrator_error)?;

    Ok(Json(ChatResponse::new(
        outcome,
        session.id().as_str(),
        &session_state,
    )))
}
