//! Integration tests for code-workbench.
//!
//! These tests drive the public API end to end:
//! - session creation and sandbox provisioning
//! - tool dispatch against a real sandbox
//! - conversation turns with a scripted model
//! - the HTTP surface over a bound listener

use async_trait::async_trait;
use code_workbench::api::{self, ServerState};
use code_workbench::config::{EmbeddingConfig, OrchestratorConfig, ToolsConfig};
use code_workbench::dispatcher::ToolDispatcher;
use code_workbench::index::LocalEmbeddingProvider;
use code_workbench::llm::{
    LLMClient, LLMClientResponse, LLMError, ModelCatalog, SamplingParams,
};
use code_workbench::messages::{Message, MessageRole, ToolCall, ToolDefinition};
use code_workbench::orchestrator::Orchestrator;
use code_workbench::session::{InMemorySessionStore, SessionState, SessionStore};
use code_workbench::tools::ToolErrorCategory;
use code_workbench::workspace::{EscapePolicy, WorkspaceSandbox};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays canned responses, then answers "done".
#[derive(Debug, Default)]
struct ScriptedModel {
    responses: Mutex<VecDeque<LLMClientResponse>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    fn new(responses: Vec<LLMClientResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMClient for ScriptedModel {
    async fn send_request(
        &self,
        messages: &[Message],
        _tools: Option<&[ToolDefinition]>,
        _sampling: Option<&SamplingParams>,
    ) -> Result<LLMClientResponse, LLMError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| LLMClientResponse::text("done")))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

fn dispatcher() -> ToolDispatcher {
    ToolDispatcher::new(
        ToolsConfig::default(),
        EmbeddingConfig::default(),
        Arc::new(LocalEmbeddingProvider::default()),
    )
}

fn orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
    Orchestrator::new(
        model,
        dispatcher(),
        ModelCatalog::default(),
        OrchestratorConfig::default(),
        "You are a coding assistant.",
    )
}

async fn sandbox(dir: &TempDir) -> WorkspaceSandbox {
    WorkspaceSandbox::provision(dir.path().join("session"), EscapePolicy::Rebase)
        .await
        .unwrap()
}

/// Starts the API on an ephemeral port and returns its base URL.
async fn start_server(dir: &TempDir, model: Arc<ScriptedModel>) -> String {
    let store = InMemorySessionStore::new(dir.path(), EscapePolicy::Rebase);
    let state = ServerState::new(Arc::new(store), Arc::new(orchestrator(model)), dir.path());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, api::router(state)).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn get_or_create_is_idempotent_and_provisions_sandbox() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let store = InMemorySessionStore::new(dir.path(), EscapePolicy::Rebase);

    let first = store.get_or_create(Some("abc")).await?;
    let second = store.get_or_create(Some("abc")).await?;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(store.len().await, 1);
    assert!(dir.path().join("abc").is_dir());

    let generated = store.get_or_create(None).await?;
    assert_ne!(generated.id(), first.id());
    assert_eq!(store.len().await, 2);
    Ok(())
}

#[tokio::test]
async fn write_then_read_round_trips_through_dispatcher() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());
    let dispatcher = dispatcher();

    let write = ToolCall::new(
        "call_1",
        "write_file",
        r#"{"file_path":"a.py","content":"print(1)"}"#,
    );
    let record = dispatcher.dispatch(&mut state, &sandbox, &write).await;
    assert!(record.outcome.is_success(), "{:?}", record.outcome);

    let read = ToolCall::new("call_2", "read_file", r#"{"file_path":"a.py"}"#);
    let record = dispatcher.dispatch(&mut state, &sandbox, &read).await;
    let payload = record.outcome.payload().unwrap();
    assert_eq!(payload["content"], "print(1)");
    assert_eq!(payload["language"], "python");

    assert_eq!(state.tool_history.len(), 2);
    assert_eq!(
        state.context.annotation("last_read_file"),
        Some(&json!("a.py"))
    );
}

#[tokio::test]
async fn unsupported_clone_scheme_is_a_validation_failure() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());

    let call = ToolCall::new(
        "call_1",
        "clone_repository",
        r#"{"repository_url":"ftp://example.com/repo.git"}"#,
    );
    let record = dispatcher().dispatch(&mut state, &sandbox, &call).await;

    assert_eq!(record.outcome.error_kind(), Some(ToolErrorCategory::Validation));
    assert!(state.context.cloned_repositories.is_empty());
}

#[tokio::test]
async fn unknown_tool_is_recorded_as_failure() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());

    let call = ToolCall::new("call_1", "delete_everything", "{}");
    let record = dispatcher().dispatch(&mut state, &sandbox, &call).await;

    assert!(!record.outcome.is_success());
    assert!(record.outcome.error().unwrap().contains("delete_everything"));
    assert_eq!(state.tool_history.len(), 1);
}

#[tokio::test]
async fn fresh_sandbox_lists_empty() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());

    let call = ToolCall::new("call_1", "list_directory", "");
    let record = dispatcher().dispatch(&mut state, &sandbox, &call).await;

    let payload = record.outcome.payload().unwrap();
    assert_eq!(payload["directories"], json!([]));
    assert_eq!(payload["files"], json!([]));
}

#[cfg(unix)]
#[tokio::test]
async fn slow_command_times_out() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());

    let call = ToolCall::new(
        "call_1",
        "execute_command",
        r#"{"command":"sleep 5","timeout":1}"#,
    );
    let started = std::time::Instant::now();
    let record = dispatcher().dispatch(&mut state, &sandbox, &call).await;

    assert_eq!(record.outcome.error_kind(), Some(ToolErrorCategory::Timeout));
    assert!(started.elapsed() < std::time::Duration::from_secs(4));
}

#[tokio::test]
async fn chat_turn_runs_tool_and_commits_history() {
    let dir = TempDir::new().unwrap();
    let sandbox = sandbox(&dir).await;
    let mut state = SessionState::new(sandbox.root().display().to_string());
    let model = ScriptedModel::new(vec![
        LLMClientResponse::with_tool_calls(
            "",
            vec![ToolCall::new(
                "call_1",
                "write_file",
                r#"{"file_path":"hello.py","content":"print('hi')"}"#,
            )],
        ),
        LLMClientResponse::text("Created hello.py"),
    ]);
    let orch = orchestrator(Arc::clone(&model));

    let outcome = orch
        .chat_turn(&mut state, &sandbox, "Write hello.py", None)
        .await
        .unwrap();

    assert_eq!(outcome.response, "Created hello.py");
    assert_eq!(outcome.tool_calls.len(), 1);
    assert_eq!(model.request_count(), 2);
    assert!(sandbox.root().join("hello.py").is_file());

    assert_eq!(state.messages.first().unwrap().role, MessageRole::User);
    assert_eq!(state.messages.last().unwrap().content, "Created hello.py");
}

#[tokio::test]
async fn http_chat_uses_and_reports_session() {
    let dir = TempDir::new().unwrap();
    let model = ScriptedModel::new(vec![
        LLMClientResponse::with_tool_calls(
            "",
            vec![ToolCall::new(
                "call_1",
                "write_file",
                r#"{"file_path":"main.rs","content":"fn main() {}"}"#,
            )],
        ),
        LLMClientResponse::text("Wrote main.rs"),
    ]);
    let base = start_server(&dir, model).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/chat"))
        .json(&json!({ "message": "make main.rs", "session_id": "web-1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["response"], "Wrote main.rs");
    assert_eq!(body["session_id"], "web-1");
    assert_eq!(body["tool_calls"][0]["tool"], "write_file");
    assert_eq!(body["context"]["last_modified_file"], "main.rs");

    let listing: Value = client
        .get(format!("{base}/workspace/web-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = listing["available_files"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["name"].as_str())
        .collect();
    assert_eq!(names, vec!["main.rs"]);

    let summary: Value = client
        .get(format!("{base}/sessions/web-1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["message_count"], 4);
}

#[tokio::test]
async fn http_rejects_bad_requests() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir, ScriptedModel::new(Vec::new())).await;
    let client = reqwest::Client::new();

    let empty = client
        .post(format!("{base}/chat"))
        .json(&json!({ "message": "  " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);

    let bad_id = client
        .post(format!("{base}/chat"))
        .json(&json!({ "message": "hi", "session_id": "../etc" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_id.status(), 400);

    let missing = client
        .get(format!("{base}/sessions/nobody"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let read_missing = client
        .post(format!("{base}/analyze_code"))
        .json(&json!({ "file_path": "nope.py", "session_id": "s1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(read_missing.status(), 404);
}

#[tokio::test]
async fn http_health_reports_sessions() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir, ScriptedModel::new(Vec::new())).await;
    let client = reqwest::Client::new();

    client
        .get(format!("{base}/workspace/alpha"))
        .send()
        .await
        .unwrap();

    let health: Value = client
        .get(format!("{base}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["sessions"], 1);

    let tools: Value = client
        .get(format!("{base}/tools"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tools.as_array().unwrap().len(), 9);
}

#[tokio::test]
async fn http_upload_saves_into_session_workspace() {
    let dir = TempDir::new().unwrap();
    let base = start_server(&dir, ScriptedModel::new(Vec::new())).await;

    let boundary = "workbench-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"directory\"\r\n\r\n\
         src\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"lib.rs\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         pub fn answer() -> u32 {{ 42 }}\r\n\
         --{boundary}--\r\n"
    );

    let response = reqwest::Client::new()
        .post(format!("{base}/upload/file/up-1"))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["file_path"], "src/lib.rs");
    assert_eq!(body["session_id"], "up-1");

    let saved = std::fs::read_to_string(dir.path().join("up-1/src/lib.rs")).unwrap();
    assert_eq!(saved, "pub fn answer() -> u32 { 42 }");
}
