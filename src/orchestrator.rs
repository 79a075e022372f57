//! Conversation orchestration.
//!
//! [`Orchestrator::chat_turn`] runs one user turn: it sends the history to
//! the model, runs any tool calls the model asks for through the
//! [`ToolDispatcher`], and re-queries until the model answers in text or the
//! round budget is spent. The single-shot operations (code generation,
//! rewrite, analysis, project generation) are one model call each, with
//! tool steps around it.
//!
//! A turn is built on a working copy of the new messages and committed to
//! the session history only once the model has answered, so a failed model
//! call leaves the history as it was.

use crate::config::OrchestratorConfig;
use crate::dispatcher::ToolDispatcher;
use crate::error::OrchestratorError;
use crate::llm::{
    fit_history, LLMClient, ModelCatalog, ModelTask, SamplingParams,
};
use crate::messages::{Message, ToolDefinition};
use crate::session::{SessionState, ToolRecord};
use crate::tools::builtins::{create_project, read_file, write_file};
use crate::tools::{all_definitions, ToolInvocation, ToolOutcome};
use crate::types::ToolCallId;
use crate::workspace::WorkspaceSandbox;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const CODE_SYSTEM_PROMPT: &str = "You are an expert software developer. \
Write clean, idiomatic, well-structured code.";

const PROJECT_SYSTEM_PROMPT: &str = "You are an expert software architect. \
Respond only with a JSON object describing the project files.";

/// Result of a chat turn or single-shot operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    /// Final assistant text
    pub response: String,
    /// Tool calls executed during the turn, in order
    pub tool_calls: Vec<ToolRecord>,
    /// Tool rounds used
    pub rounds: usize,
    /// Model that produced the response
    pub model_used: String,
}

/// A code generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeRequest {
    /// What the code should do
    pub description: String,
    /// Target language
    pub language: String,
    /// Optional framework
    pub framework: Option<String>,
    /// Optional structured requirements
    pub specifications: Option<Value>,
}

/// A project generation request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRequest {
    /// Project name; also the directory the project is created in
    pub project_name: String,
    /// What the project is
    pub description: String,
    /// Technologies to use
    pub technologies: Vec<String>,
    /// Features to include
    pub features: Vec<String>,
}

/// Runs conversation turns and generation requests for a session.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    llm: Arc<dyn LLMClient>,
    dispatcher: ToolDispatcher,
    catalog: ModelCatalog,
    config: OrchestratorConfig,
    system_prompt: String,
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LLMClient>,
        dispatcher: ToolDispatcher,
        catalog: ModelCatalog,
        config: OrchestratorConfig,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            dispatcher,
            catalog,
            config,
            system_prompt: system_prompt.into(),
        }
    }

    /// Returns the dispatcher used for tool calls.
    #[must_use]
    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Returns the model catalog.
    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Runs one conversational turn.
    ///
    /// Tools are offered for up to `max_tool_rounds` rounds; the request
    /// after the last round goes out without tools, and any tool calls in
    /// its response are ignored.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if any model call fails. The message
    /// history is then unchanged, though tools that already ran keep their
    /// effects and their records.
    pub async fn chat_turn(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        user_message: &str,
        model_preference: Option<&str>,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let model = self.catalog.select(ModelTask::Conversation, model_preference);
        let sampling = SamplingParams::new()
            .with_model(&model.name)
            .with_temperature(self.config.chat_temperature)
            .with_max_tokens(model.max_tokens);
        let tools = all_definitions();

        let mut pending = vec![Message::user(user_message)];
        let mut records = Vec::new();
        let mut rounds = 0;

        let response = loop {
            let offer_tools = rounds < self.config.max_tool_rounds;
            let prompt = self.build_prompt(state, &pending);
            let offered: Option<&[ToolDefinition]> = offer_tools.then_some(tools.as_slice());

            tracing::debug!(
                model = %model.name,
                round = rounds,
                messages = prompt.len(),
                tools_offered = offer_tools,
                "sending chat request"
            );
            let response = self
                .llm
                .send_request(&prompt, offered, Some(&sampling))
                .await?;

            if response.tool_calls.is_empty() {
                break response.content;
            }
            if !offer_tools {
                tracing::warn!(
                    count = response.tool_calls.len(),
                    "ignoring tool calls after the last tool round"
                );
                break response.content;
            }

            rounds += 1;
            pending.push(Message::assistant_with_tools(
                response.content,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let record = self.dispatcher.dispatch(state, sandbox, call).await;
                pending.push(Message::tool(&call.id, record.outcome.to_message_content()));
                records.push(record);
            }
        };

        pending.push(Message::assistant(&response));
        state.messages.extend(pending);

        tracing::info!(
            model = %model.name,
            rounds,
            tool_calls = records.len(),
            "chat turn complete"
        );
        Ok(TurnOutcome {
            response,
            tool_calls: records,
            rounds,
            model_used: model.name.clone(),
        })
    }

    /// Generates code from a description.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the model call fails.
    pub async fn generate_code(
        &self,
        state: &mut SessionState,
        request: &CodeRequest,
        model_preference: Option<&str>,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let prompt = code_prompt(request);
        let (response, model_used) = self
            .complete(
                CODE_SYSTEM_PROMPT,
                &prompt,
                ModelTask::CodeGeneration,
                self.config.chat_temperature,
                model_preference,
            )
            .await?;

        state.messages.push(Message::user(prompt));
        state.messages.push(Message::assistant(&response));
        Ok(TurnOutcome {
            response,
            tool_calls: Vec::new(),
            rounds: 0,
            model_used,
        })
    }

    /// Rewrites a workspace file according to `instructions`.
    ///
    /// The file is read and written back through the file tools, so both
    /// steps appear in the tool history.
    ///
    /// # Errors
    ///
    /// Returns a tool error if the file cannot be read or written and an
    /// upstream error if the model call fails.
    pub async fn rewrite_file(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        file_path: &str,
        instructions: &str,
        model_preference: Option<&str>,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let mut records = Vec::new();
        let original = self.read_source(state, sandbox, file_path, &mut records).await?;

        let prompt = format!(
            "{}Please modify the following code according to these instructions:\n\n\
             Instructions:\n```\n{instructions}\n```\n\n\
             Original code:\n```\n{original}\n```\n\n\
             Please return the modified code.",
            file_context(file_path)
        );
        let (response, model_used) = self
            .complete(
                CODE_SYSTEM_PROMPT,
                &prompt,
                ModelTask::CodeGeneration,
                self.config.edit_temperature,
                model_preference,
            )
            .await?;
        let rewritten = strip_code_fence(&response).to_string();

        let write = ToolInvocation::WriteFile(write_file::WriteFileArgs {
            file_path: file_path.to_string(),
            content: rewritten.clone(),
        });
        let record = self.run_tool(state, sandbox, write).await;
        records.push(record.clone());
        require_success(&record)?;

        state
            .messages
            .push(Message::user(format!("Rewritten code for {file_path}")));
        state.messages.push(Message::assistant(&rewritten));
        Ok(TurnOutcome {
            response: rewritten,
            tool_calls: records,
            rounds: 0,
            model_used,
        })
    }

    /// Explains a workspace file: summary, components, issues, practices.
    ///
    /// # Errors
    ///
    /// Returns a tool error if the file cannot be read and an upstream
    /// error if the model call fails.
    pub async fn analyze_code(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        file_path: &str,
        model_preference: Option<&str>,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let mut records = Vec::new();
        let code = self.read_source(state, sandbox, file_path, &mut records).await?;

        let prompt = format!(
            "{}As an expert code reviewer, please analyze the following code and provide:\n\
             1. A high-level summary of what the code does\n\
             2. Breakdown of major components/functions\n\
             3. Key functions/classes and their purpose\n\
             4. Potential issues or bugs\n\
             5. Best practices that are followed or could be improved\n\n\
             ```\n{code}\n```\n\n\
             Format your response using Markdown with clear headings and bullet points.",
            file_context(file_path)
        );
        let (response, model_used) = self
            .complete(
                &self.system_prompt,
                &prompt,
                ModelTask::CodeUnderstanding,
                self.config.edit_temperature,
                model_preference,
            )
            .await?;

        state
            .messages
            .push(Message::user(format!("Analyze code in {file_path}")));
        state.messages.push(Message::assistant(&response));
        Ok(TurnOutcome {
            response,
            tool_calls: records,
            rounds: 0,
            model_used,
        })
    }

    /// Asks the model for a project tree and creates it under the project
    /// name.
    ///
    /// The response is the created item tree as JSON.
    ///
    /// # Errors
    ///
    /// - upstream if the model call fails
    /// - invalid model output if no JSON object can be found in the answer
    /// - a tool error if the tree cannot be created
    pub async fn generate_project(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        request: &ProjectRequest,
        model_preference: Option<&str>,
    ) -> Result<TurnOutcome, OrchestratorError> {
        let prompt = project_prompt(request);
        let (answer, model_used) = self
            .complete(
                PROJECT_SYSTEM_PROMPT,
                &prompt,
                ModelTask::ProjectGeneration,
                self.config.chat_temperature,
                model_preference,
            )
            .await?;

        let structure = extract_json_object(&answer).ok_or_else(|| {
            OrchestratorError::invalid_model_output("expected a JSON object describing the project")
        })?;

        let create = ToolInvocation::CreateProjectStructure(create_project::CreateProjectArgs {
            structure,
            base_dir: request.project_name.clone(),
        });
        let record = self.run_tool(state, sandbox, create).await;
        let payload = require_success(&record)?;
        let response = serde_json::to_string_pretty(&payload["structure"])
            .unwrap_or_else(|_| payload["structure"].to_string());

        state.messages.push(Message::user(format!(
            "Generate project structure for {}",
            request.project_name
        )));
        state.messages.push(Message::assistant(&response));
        Ok(TurnOutcome {
            response,
            tool_calls: vec![record],
            rounds: 0,
            model_used,
        })
    }

    /// Assembles system prompt, fitted history and the turn's new messages.
    fn build_prompt(&self, state: &SessionState, pending: &[Message]) -> Vec<Message> {
        let context = serde_json::to_string_pretty(&state.context_json()).unwrap_or_default();
        let system = format!(
            "{}\n\nCurrent workspace context:\n```json\n{context}\n```",
            self.system_prompt
        );

        let history = fit_history(&state.messages, self.config.max_history_tokens);
        if history.len() < state.messages.len() {
            tracing::debug!(
                dropped = state.messages.len() - history.len(),
                "older turns left out of the prompt"
            );
        }

        let mut prompt = Vec::with_capacity(history.len() + pending.len() + 1);
        prompt.push(Message::system(system));
        prompt.extend_from_slice(history);
        prompt.extend_from_slice(pending);
        prompt
    }

    /// One tool-free model call; returns the text and the model used.
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        task: ModelTask,
        temperature: f32,
        model_preference: Option<&str>,
    ) -> Result<(String, String), OrchestratorError> {
        let model = self.catalog.select(task, model_preference);
        let sampling = SamplingParams::new()
            .with_model(&model.name)
            .with_temperature(temperature)
            .with_max_tokens(model.max_tokens);
        let messages = [Message::system(system), Message::user(prompt)];

        tracing::debug!(model = %model.name, %task, "sending single-shot request");
        let response = self
            .llm
            .send_request(&messages, None, Some(&sampling))
            .await?;
        Ok((response.content, model.name.clone()))
    }

    async fn run_tool(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        invocation: ToolInvocation,
    ) -> ToolRecord {
        self.dispatcher
            .dispatch_invocation(state, sandbox, ToolCallId::new().to_string(), invocation)
            .await
    }

    async fn read_source(
        &self,
        state: &mut SessionState,
        sandbox: &WorkspaceSandbox,
        file_path: &str,
        records: &mut Vec<ToolRecord>,
    ) -> Result<String, OrchestratorError> {
        let read = ToolInvocation::ReadFile(read_file::ReadFileArgs {
            file_path: file_path.to_string(),
        });
        let record = self.run_tool(state, sandbox, read).await;
        records.push(record.clone());
        let payload = require_success(&record)?;
        Ok(payload["content"].as_str().unwrap_or_default().to_string())
    }
}

fn require_success(record: &ToolRecord) -> Result<Value, OrchestratorError> {
    match &record.outcome {
        ToolOutcome::Success { payload } => Ok(payload.clone()),
        ToolOutcome::Failure { kind, error } => {
            Err(OrchestratorError::tool_failed(*kind, error.clone()))
        }
    }
}

fn file_context(file_path: &str) -> String {
    if file_path.is_empty() {
        String::new()
    } else {
        format!("This code is from file: {file_path}\n\n")
    }
}

fn code_prompt(request: &CodeRequest) -> String {
    let mut prompt = format!(
        "Generate code for the following description:\n\n```\n{}\n```\n\nLanguage: {}",
        request.description, request.language
    );
    if let Some(framework) = request.framework.as_deref().filter(|f| !f.is_empty()) {
        prompt.push_str(&format!("\nFramework: {framework}"));
    }
    if let Some(specs) = &request.specifications {
        let specs = serde_json::to_string_pretty(specs).unwrap_or_else(|_| specs.to_string());
        prompt.push_str(&format!("\n\nSpecifications:\n```json\n{specs}\n```"));
    }
    prompt
}

fn project_prompt(request: &ProjectRequest) -> String {
    format!(
        "Generate a project structure for the following specifications:\n\n\
         ```\n\
         Project Name: {}\n\
         Description: {}\n\
         Technologies: {}\n\
         Features: {}\n\
         ```\n\n\
         Format your response as a nested dictionary where keys are file/directory names \
         and values are either file contents (strings) or nested dictionaries for \
         directories. Respond with JSON only.",
        request.project_name,
        request.description,
        request.technologies.join(", "),
        request.features.join(", ")
    )
}

/// Removes one code fence wrapping the whole text, if present.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return text;
    };
    // The opening fence line may carry a language tag.
    match body.split_once('\n') {
        Some((_, inner)) => inner.strip_suffix('\n').unwrap_or(inner),
        None => body,
    }
}

/// Finds a JSON object in model output, fenced or surrounded by prose.
fn extract_json_object(text: &str) -> Option<Value> {
    let candidates = [text.trim(), strip_code_fence(text).trim()];
    for candidate in candidates {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str(candidate) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}
