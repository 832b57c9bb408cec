//! Gemini model over the REST `generateContent` API.

use std::time::Duration;

use arag_core::{
    AragError, Content, FunctionDeclaration, GenerateContentConfig, Llm, LlmRequest, LlmResponse,
    Part, Result, RetryPolicy,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`GeminiModel`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Google AI Studio API key.
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.0-flash-lite`.
    pub model: String,
    /// API root, overridable for tests and proxies.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Backoff applied to rate limits and server errors.
    pub retry: RetryPolicy,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// A Gemini model reached over HTTPS.
pub struct GeminiModel {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiModel {
    /// Create a model client. Fails when the API key is blank.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(AragError::Config("Gemini API key must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AragError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn send(&self, body: &WireRequest) -> Result<LlmResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.classify_transport_error(e))?;

        if !status.is_success() {
            let detail = error_message(&text).unwrap_or(text);
            let message = format!("Gemini returned {status}: {detail}");
            return if status.as_u16() == 429 || status.is_server_error() {
                Err(AragError::ModelTransient(message))
            } else {
                Err(AragError::Model(message))
            };
        }

        let parsed: WireResponse = serde_json::from_str(&text)
            .map_err(|e| AragError::Model(format!("invalid Gemini response: {e}")))?;
        Ok(parsed.into_llm_response())
    }

    fn classify_transport_error(&self, err: reqwest::Error) -> AragError {
        if err.is_timeout() {
            AragError::Timeout { service: "Gemini".to_string(), after: self.config.timeout }
        } else if err.is_connect() || err.is_request() {
            AragError::ModelTransient(format!("Gemini request failed: {err}"))
        } else {
            AragError::Model(format!("Gemini request failed: {err}"))
        }
    }
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate_content(&self, request: LlmRequest) -> Result<LlmResponse> {
        let body = WireRequest::from_request(&request);
        debug!(model = %self.config.model, contents = body.contents.len(), "calling Gemini");

        self.config
            .retry
            .run("gemini.generate_content", AragError::is_retryable, || self.send(&body))
            .await
            .inspect_err(|e| error!(model = %self.config.model, error = %e, "Gemini call failed"))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireRequest {
    contents: Vec<WireContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTools>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

impl WireRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let tools = if request.tools.is_empty() {
            Vec::new()
        } else {
            vec![WireTools { function_declarations: request.tools.clone() }]
        };
        Self {
            contents: request.contents.iter().map(WireContent::from_content).collect(),
            system_instruction: request.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart { text: Some(text.clone()), ..WirePart::default() }],
            }),
            tools,
            generation_config: request.config.as_ref().map(WireGenerationConfig::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<i32>,
}

impl From<&GenerateContentConfig> for WireGenerationConfig {
    fn from(config: &GenerateContentConfig) -> Self {
        Self {
            temperature: config.temperature,
            top_p: config.top_p,
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl WireContent {
    fn from_content(content: &Content) -> Self {
        Self {
            role: Some(content.role.clone()),
            parts: content.parts.iter().map(WirePart::from_part).collect(),
        }
    }

    fn into_content(self) -> Content {
        let mut content = Content::new(self.role.unwrap_or_else(|| "model".to_string()));
        content.parts = self.parts.into_iter().filter_map(WirePart::into_part).collect();
        content
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

impl WirePart {
    fn from_part(part: &Part) -> Self {
        match part {
            Part::Text { text } => Self { text: Some(text.clone()), ..Self::default() },
            Part::FunctionCall { id, name, args } => Self {
                function_call: Some(WireFunctionCall {
                    id: id.clone(),
                    name: name.clone(),
                    args: args.clone(),
                }),
                ..Self::default()
            },
            Part::FunctionResponse { id, name, response } => Self {
                function_response: Some(WireFunctionResponse {
                    id: id.clone(),
                    name: name.clone(),
                    // The API requires an object here.
                    response: if response.is_object() {
                        response.clone()
                    } else {
                        json!({ "result": response })
                    },
                }),
                ..Self::default()
            },
        }
    }

    fn into_part(self) -> Option<Part> {
        if let Some(call) = self.function_call {
            return Some(Part::FunctionCall { id: call.id, name: call.name, args: call.args });
        }
        if let Some(response) = self.function_response {
            return Some(Part::FunctionResponse {
                id: response.id,
                name: response.name,
                response: response.response,
            });
        }
        self.text.map(|text| Part::Text { text })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl WireResponse {
    fn into_llm_response(self) -> LlmResponse {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        match self.candidates.into_iter().next() {
            Some(candidate) => LlmResponse {
                content: candidate.content.map(WireContent::into_content),
                finish_reason: candidate.finish_reason,
            },
            None => LlmResponse { content: None, finish_reason: block_reason },
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}
