//! Scripted [`Llm`] for tests: queued replies or errors, with every request
//! recorded for inspection.

use std::collections::VecDeque;
use std::sync::Mutex;

use arag_core::{AragError, Content, Llm, LlmRequest, LlmResponse, Part, Result};
use async_trait::async_trait;
use serde_json::Value;

enum Scripted {
    Response(LlmResponse),
    Error(AragError),
}

/// A scripted model for tests.
///
/// Replies are returned in the order they were queued. Once the script runs
/// out, every call returns a response without content. Each request is
/// recorded and can be inspected with [`MockLlm::requests`].
pub struct MockLlm {
    name: String,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(self, response: LlmResponse) -> Self {
        self.push(Scripted::Response(response));
        self
    }

    /// Queue a plain text reply.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(LlmResponse::new(Content::new("model").with_text(text)))
    }

    /// Queue a reply that calls `tool` with `args`.
    pub fn with_function_call(self, tool: impl Into<String>, args: Value) -> Self {
        self.with_response(LlmResponse::new(Content::new("model").with_part(
            Part::FunctionCall { id: None, name: tool.into(), args },
        )))
    }

    /// Queue a failure.
    pub fn with_error(self, error: AragError) -> Self {
        self.push(Scripted::Error(error));
        self
    }

    /// All requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn push(&self, item: Scripted) {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(item);
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);
        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Error(error)) => Err(error),
            None => Ok(LlmResponse::default()),
        }
    }
}
