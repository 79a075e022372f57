//! LLM client trait abstraction.
//!
//! The orchestrator talks to the model only through [`LLMClient`], so tests
//! can substitute a scripted client for the HTTP one.

use crate::llm::error::LLMError;
use crate::messages::{Message, StopReason, ToolCall, ToolDefinition};
use async_trait::async_trait;

/// Response from an LLM request.
#[derive(Debug, Clone, PartialEq)]
pub struct LLMClientResponse {
    /// The generated text content
    pub content: String,
    /// Tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason the model stopped generating
    pub stop_reason: StopReason,
}

impl LLMClientResponse {
    /// Creates a plain text response that ends the turn.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            stop_reason: StopReason::EndTurn,
        }
    }

    /// Creates a response requesting tool calls.
    #[must_use]
    pub fn with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: content.into(),
            tool_calls,
            stop_reason: StopReason::ToolUse,
        }
    }
}

/// Per-request sampling parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingParams {
    /// Model to use instead of the client's default
    pub model: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl SamplingParams {
    /// Creates empty sampling parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the generation limit.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Trait for LLM API clients.
///
/// # Example
///
/// ```ignore
/// use code_workbench::llm::{LLMClient, OpenAIClient, SamplingParams};
///
/// let client = OpenAIClient::from_config(&config.llm)?;
/// let messages = vec![Message::user("Hello!")];
/// let sampling = SamplingParams::new().with_temperature(0.7);
/// let response = client.send_request(&messages, None, Some(&sampling)).await?;
/// ```
#[async_trait]
pub trait LLMClient: Send + Sync + std::fmt::Debug {
    /// Sends a request to the LLM and waits for the complete response.
    ///
    /// # Arguments
    ///
    /// * `messages` - The conversation messages
    /// * `tools` - Optional tool definitions available to the LLM
    /// * `sampling` - Optional sampling parameters for this request
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn send_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        sampling: Option<&SamplingParams>,
    ) -> Result<LLMClientResponse, LLMError>;

    /// Returns the name of this provider for logging.
    fn provider_name(&self) -> &'static str;
}
