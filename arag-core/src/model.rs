//! The language model abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::Content;
use crate::error::Result;

/// A tool the model may call, described for the provider's function-calling API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    /// Tool name.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON schema of the tool arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Sampling parameters for a model call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentConfig {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Nucleus sampling cutoff.
    pub top_p: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_output_tokens: Option<i32>,
}

/// A single request to a language model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation so far, oldest first.
    pub contents: Vec<Content>,
    /// System directive.
    pub system_instruction: Option<String>,
    /// Tools the model may call.
    pub tools: Vec<FunctionDeclaration>,
    /// Sampling parameters.
    pub config: Option<GenerateContentConfig>,
}

impl LlmRequest {
    /// Create a request with no system directive, tools or sampling overrides.
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            contents,
            system_instruction: None,
            tools: Vec::new(),
            config: None,
        }
    }

    /// Set the system directive.
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the tools the model may call.
    pub fn with_tools(mut self, tools: Vec<FunctionDeclaration>) -> Self {
        self.tools = tools;
        self
    }
}

/// A model's reply to an [`LlmRequest`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmResponse {
    /// The produced message, if the model produced one.
    pub content: Option<Content>,
    /// Provider finish reason (`STOP`, `MAX_TOKENS`, ...).
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    /// A response carrying `content`.
    pub fn new(content: Content) -> Self {
        Self { content: Some(content), finish_reason: None }
    }
}

/// A language model.
///
/// Implementations wrap a specific provider behind one request/response call.
#[async_trait]
pub trait Llm: Send + Sync {
    /// The model identifier.
    fn name(&self) -> &str;

    /// Run one inference call.
    async fn generate_content(&self, request: LlmRequest) -> Result<LlmResponse>;
}
