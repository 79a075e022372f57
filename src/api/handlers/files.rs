use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use std::path::Path as FsPath;

use super::helpers::{bad_request, internal_error, not_found, session_error, tool_error, ApiResult};
use crate::api::types::{ActionResponse, CreateFolderRequest, UploadResponse};
use crate::api::ServerState;
use crate::session::{Session, SessionState};
use crate::tools::builtins::index_files::IndexFilesArgs;
use crate::tools::{ToolError, ToolInvocation};
use crate::types::ToolCallId;
use crate::workspace::file_info;

struct UploadedFile {
    name: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    session_id: Option<String>,
    directory: Option<String>,
}

/// Reads every multipart field; text fields may arrive in any order.
async fn read_form(mut multipart: Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read upload: {e}")))?;
                form.files.push(UploadedFile {
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "session_id" | "path" | "directory" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| bad_request(format!("invalid field '{name}': {e}")))?;
                let value = Some(value).filter(|v| !v.trim().is_empty());
                if name == "session_id" {
                    form.session_id = value;
                } else {
                    form.directory = value;
                }
            }
            other => tracing::debug!(field = other, "ignoring unknown upload field"),
        }
    }
    Ok(form)
}

/// Keeps only the final component of a client-supplied file name.
fn clean_file_name(raw: &str) -> Option<String> {
    let name = raw.rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}

async fn save_upload(
    state: &ServerState,
    session: &Session,
    session_state: &mut SessionState,
    directory: Option<&str>,
    file: UploadedFile,
) -> ApiResult<UploadResponse> {
    let file_name =
        clean_file_name(&file.name).ok_or_else(|| bad_request("uploaded file has no name"))?;
    let target = match directory {
        Some(dir) => FsPath::new(dir).join(&file_name),
        None => FsPath::new(&file_name).to_path_buf(),
    };

    let sandbox = session.sandbox();
    let path = sandbox
        .resolve(&target)
        .map_err(|e| tool_error(ToolError::from(e)))?;
    sandbox
        .ensure_parent(&path)
        .await
        .map_err(|e| tool_error(ToolError::from(e)))?;
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|e| internal_error(format!("failed to save {file_name}: {e}")))?;
    let info = file_info(sandbox, &path)
        .await
        .map_err(|e| tool_error(ToolError::from(e)))?;

    let index = ToolInvocation::IndexFiles(IndexFilesArgs {
        file_paths: Some(vec![info.path.clone()]),
    });
    let record = state
        .orchestrator
        .dispatcher()
        .dispatch_invocation(session_state, sandbox, ToolCallId::new().to_string(), index)
        .await;
    if let Some(error) = record.outcome.error() {
        tracing::debug!(file = %info.path, error, "uploaded file not indexed");
    }

    session_state
        .context
        .annotate("last_uploaded_file", info.path.clone());
    session_state
        .context
        .append_annotation("uploaded_files", info.path.clone());

    tracing::info!(session_id = %session.id(), file = %info.path, size = info.size, "file uploaded");
    Ok(UploadResponse {
        success: true,
        message: format!("Successfully uploaded {file_name}"),
        file_path: info.path,
        size: info.size,
        session_id: session.id().to_string(),
    })
}

async fn upload_single(
    state: ServerState,
    session_id: Option<String>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut form = read_form(multipart).await?;
    let file = form
        .files
        .pop()
        .ok_or_else(|| bad_request("multipart field 'file' is required"))?;
    let session_id = session_id.or(form.session_id);

    let session = state
        .sessions
        .get_or_create(session_id.as_deref())
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;
    let response = save_upload(
        &state,
        &session,
        &mut session_state,
        form.directory.as_deref(),
        file,
    )
    .await?;
    Ok(Json(response))
}

pub async fn handle_upload(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    upload_single(state, None, multipart).await
}

pub async fn handle_upload_file(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    upload_single(state, Some(session_id), multipart).await
}

pub async fn handle_upload_files(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Json<Vec<UploadResponse>>> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(bad_request("multipart field 'files' is required"));
    }

    let session = state
        .sessions
        .get_or_create(Some(&session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;

    let mut responses = Vec::with_capacity(form.files.len());
    for file in form.files {
        let response = save_upload(
            &state,
            &session,
            &mut session_state,
            form.directory.as_deref(),
            file,
        )
        .await?;
        responses.push(response);
    }
    Ok(Json(responses))
}

pub async fn handle_create_folder(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
    Json(req): Json<CreateFolderRequest>,
) -> ApiResult<Json<ActionResponse>> {
    let session = state
        .sessions
        .get_or_create(Some(&session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;
    let sandbox = session.sandbox();

    let path = sandbox
        .resolve(&req.path)
        .map_err(|e| tool_error(ToolError::from(e)))?;
    if sandbox.is_root(&path) {
        return Err(bad_request("folder path is required"));
    }
    tokio::fs::create_dir_all(&path)
        .await
        .map_err(|e| bad_request(format!("Error creating folder: {e}")))?;

    let rel = sandbox.relative(&path);
    session_state
        .context
        .annotate("last_created_folder", rel.clone());
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Folder created: {rel}"),
        path: Some(rel),
    }))
}

pub async fn handle_delete_path(
    State(state): State<ServerState>,
    Path((session_id, path)): Path<(String, String)>,
) -> ApiResult<Json<ActionResponse>> {
    let session = state
        .sessions
        .get_or_create(Some(&session_id))
        .await
        .map_err(session_error)?;
    let mut session_state = session.lock().await;
    let sandbox = session.sandbox();

    let target = sandbox
        .resolve(&path)
        .map_err(|e| tool_error(ToolError::from(e)))?;
    if sandbox.is_root(&target) {
        return Err(bad_request("refusing to delete the workspace root"));
    }
    let rel = sandbox.relative(&target);
    let metadata = tokio::fs::symlink_metadata(&target)
        .await
        .map_err(|_| not_found(format!("Path not found: {rel}")))?;

    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(&target).await
    } else {
        tokio::fs::remove_file(&target).await
    };
    removed.map_err(|e| internal_error(format!("Error deleting {rel}: {e}")))?;

    session_state.context.annotate("last_deleted_path", rel.clone());
    tracing::info!(session_id = %session.id(), path = %rel, "path deleted");
    Ok(Json(ActionResponse {
        success: true,
        message: format!("Successfully deleted {rel}"),
        path: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(clean_file_name("a.py").as_deref(), Some("a.py"));
        assert_eq!(clean_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(clean_file_name("C:\\tmp\\x.txt").as_deref(), Some("x.txt"));
        assert_eq!(clean_file_name(""), None);
        assert_eq!(clean_file_name("dir/"), None);
        assert_eq!(clean_file_name(".."), None);
    }
}
