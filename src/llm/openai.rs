//! OpenAI-compatible API client.
//!
//! HTTP client for chat-completion APIs that follow the OpenAI wire format:
//! Groq, OpenAI, Ollama, vLLM and similar endpoints.

use crate::config::LlmConfig;
use crate::llm::client::{LLMClient, LLMClientResponse, SamplingParams};
use crate::llm::error::LLMError;
use crate::messages::{Message, MessageRole, StopReason, ToolCall, ToolDefinition};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for OpenAI-compatible chat-completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// API key (optional for local providers like Ollama)
    api_key: Option<String>,
    /// Model used when the request does not name one
    model: String,
    /// Generation limit used when the request does not set one
    max_tokens: u32,
    /// Request timeout, reported in timeout errors
    timeout: Duration,
}

/// Request body for the chat completions API.
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    stream: bool,
}

/// A message in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// A tool definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAITool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAIFunction,
}

/// A function definition in OpenAI format.
#[derive(Debug, Clone, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

/// A tool call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: OpenAIFunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

/// A function call in OpenAI format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Response from the chat completions API.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

/// A choice in the response.
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

/// Error response from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Clone, Deserialize)]
struct OpenAIErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    message: String,
}

impl OpenAIClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// An empty `api_key` means no `Authorization` header is sent.
    ///
    /// # Errors
    ///
    /// Returns `LLMError::network` if the HTTP client cannot be created.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, LLMError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LLMError::network(format!("failed to create HTTP client: {}", e)))?;

        let api_key = api_key.into();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: (!api_key.is_empty()).then_some(api_key),
            model: model.into(),
            max_tokens,
            timeout,
        })
    }

    /// Creates a client from the `[llm]` configuration section.
    ///
    /// The first catalog model is the default; requests override it through
    /// [`SamplingParams::model`].
    ///
    /// # Errors
    ///
    /// Returns `LLMError::invalid_config` if the catalog is empty, or a
    /// network error if the HTTP client cannot be created.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LLMError> {
        let default = config
            .models
            .first()
            .ok_or_else(|| LLMError::invalid_config("llm.models", "at least one model is required"))?;

        let api_key = config.resolve_api_key();
        if api_key.is_empty() {
            tracing::warn!(
                env = ?config.api_key_env,
                "no LLM API key configured; requests will be sent without authorization"
            );
        }

        Self::new(
            config.base_url.clone(),
            api_key,
            default.name.clone(),
            default.max_tokens,
            config.timeout(),
        )
    }

    /// Returns the chat completions endpoint URL.
    fn chat_completions_endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Converts internal messages to OpenAI API format.
    fn convert_messages(messages: &[Message]) -> Vec<OpenAIMessage> {
        messages
            .iter()
            .map(|msg| match msg.role {
                MessageRole::System | MessageRole::User => OpenAIMessage {
                    role: msg.role.as_str().to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                MessageRole::Assistant => {
                    let tool_calls = msg.tool_calls.as_ref().map(|tcs| {
                        tcs.iter()
                            .map(|tc| OpenAIToolCall {
                                id: tc.id.clone(),
                                call_type: function_type(),
                                function: OpenAIFunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect()
                    });

                    OpenAIMessage {
                        role: "assistant".to_string(),
                        content: if msg.content.is_empty() && tool_calls.is_some() {
                            None
                        } else {
                            Some(msg.content.clone())
                        },
                        tool_calls,
                        tool_call_id: None,
                    }
                }
                MessageRole::Tool => OpenAIMessage {
                    role: "tool".to_string(),
                    content: Some(msg.content.clone()),
                    tool_calls: None,
                    tool_call_id: msg.tool_call_id.clone(),
                },
            })
            .collect()
    }

    /// Converts tool definitions to OpenAI API format.
    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAITool> {
        tools
            .iter()
            .map(|t| OpenAITool {
                tool_type: function_type(),
                function: OpenAIFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    /// Parses an OpenAI finish reason.
    #[must_use]
    pub fn parse_stop_reason(reason: Option<&str>) -> StopReason {
        match reason {
            Some("stop") => StopReason::EndTurn,
            Some("length") => StopReason::MaxTokens,
            Some("tool_calls") => StopReason::ToolUse,
            _ => StopReason::EndTurn,
        }
    }

    fn build_body(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        sampling: Option<&SamplingParams>,
    ) -> ChatCompletionRequest {
        let model = sampling
            .and_then(|s| s.model.clone())
            .unwrap_or_else(|| self.model.clone());
        let max_tokens = sampling
            .and_then(|s| s.max_tokens)
            .unwrap_or(self.max_tokens);

        ChatCompletionRequest {
            model,
            messages: Self::convert_messages(messages),
            max_tokens: Some(max_tokens),
            temperature: sampling.and_then(|s| s.temperature),
            tools: tools
                .filter(|t| !t.is_empty())
                .map(Self::convert_tools),
            stream: false,
        }
    }

    /// Builds the request with optional authorization header.
    fn build_request(&self, request_body: &ChatCompletionRequest) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(self.chat_completions_endpoint())
            .header("content-type", "application/json")
            .json(request_body);

        if let Some(ref api_key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        request
    }

    /// Parses an error response from the API.
    async fn parse_error_response(response: reqwest::Response) -> LLMError {
        let status = response.status();
        let status_code = status.as_u16();

        if status_code == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);

            return LLMError::rate_limited(Duration::from_secs(retry_after));
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<OpenAIErrorResponse>(&error_body) {
            let detail = api_error.error;
            let kind = detail
                .error_type
                .as_deref()
                .or(detail.code.as_deref())
                .unwrap_or("unknown");

            match kind {
                "authentication_error" | "invalid_api_key" => {
                    LLMError::authentication_failed(detail.message)
                }
                "invalid_request_error" => LLMError::invalid_request(detail.message),
                _ => LLMError::api_error(status_code, detail.message, detail.error_type),
            }
        } else if status_code == 401 {
            LLMError::authentication_failed(error_body)
        } else {
            LLMError::api_error(
                status_code,
                if error_body.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    error_body
                },
                None,
            )
        }
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn send_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        sampling: Option<&SamplingParams>,
    ) -> Result<LLMClientResponse, LLMError> {
        let request_body = self.build_body(messages, tools, sampling);
        tracing::debug!(
            model = %request_body.model,
            messages = request_body.messages.len(),
            tools = request_body.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion request"
        );

        let response = self
            .build_request(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::timeout(self.timeout)
                } else {
                    LLMError::network(format!("request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Self::parse_error_response(response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LLMError::parse_error(format!("failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(LLMError::empty_response)?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect::<Vec<_>>();

        let stop_reason = if tool_calls.is_empty() {
            Self::parse_stop_reason(choice.finish_reason.as_deref())
        } else {
            StopReason::ToolUse
        };

        Ok(LLMClientResponse {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            stop_reason,
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
