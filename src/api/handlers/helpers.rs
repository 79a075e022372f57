use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::{OrchestratorError, OrchestratorErrorKind, SessionError, SessionErrorKind};
use crate::session::ToolRecord;
use crate::tools::{ToolError, ToolErrorCategory, ToolOutcome};

pub type ApiError = (StatusCode, Json<Value>);
pub type ApiResult<T> = Result<T, ApiError>;

pub fn error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": msg.into() })))
}

pub fn bad_request(msg: impl Into<String>) -> ApiError {
    error(StatusCode::BAD_REQUEST, msg)
}

pub fn not_found(msg: impl Into<String>) -> ApiError {
    error(StatusCode::NOT_FOUND, msg)
}

pub fn internal_error(msg: impl Into<String>) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, msg)
}

pub fn status_for(category: ToolErrorCategory) -> StatusCode {
    match category {
        ToolErrorCategory::Validation | ToolErrorCategory::Resource => StatusCode::BAD_REQUEST,
        ToolErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ToolErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ToolErrorCategory::Upstream => StatusCode::BAD_GATEWAY,
        ToolErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn session_error(e: SessionError) -> ApiError {
    let status = match &e.kind {
        SessionErrorKind::InvalidId { .. } => StatusCode::BAD_REQUEST,
        SessionErrorKind::NotFound { .. } => StatusCode::NOT_FOUND,
        SessionErrorKind::ProvisionFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error(status, e.to_string())
}

pub fn orchestrator_error(e: OrchestratorError) -> ApiError {
    let status = match &e.kind {
        OrchestratorErrorKind::Upstream(llm) if llm.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
        OrchestratorErrorKind::Upstream(_) | OrchestratorErrorKind::InvalidModelOutput { .. } => {
            StatusCode::BAD_GATEWAY
        }
        OrchestratorErrorKind::Tool { category, .. } => status_for(*category),
    };
    tracing::warn!(status = status.as_u16(), error = %e, "request failed");
    error(status, e.to_string())
}

pub fn tool_error(e: ToolError) -> ApiError {
    error(status_for(e.category()), e.to_string())
}

/// Renders a tool record as the outcome body with a matching status.
pub fn outcome_response(record: &ToolRecord) -> (StatusCode, Json<Value>) {
    let status = match &record.outcome {
        ToolOutcome::Success { .. } => StatusCode::OK,
        ToolOutcome::Failure { kind, .. } => status_for(*kind),
    };
    let body = serde_json::to_value(&record.outcome).unwrap_or(Value::Null);
    (status, Json(body))
}

pub fn require_non_empty(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(bad_request(format!("{field} is required")));
    }
    Ok(())
}
