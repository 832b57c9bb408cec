//! Role-tagged message content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single message in a conversation with a model.
///
/// Roles follow the Gemini convention: `"user"` for caller input and tool
/// results, `"model"` for model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// The author of the message.
    pub role: String,
    /// The message body.
    pub parts: Vec<Part>,
}

/// One piece of a [`Content`] message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
    /// A request from the model to call a tool.
    FunctionCall {
        /// Provider-assigned call identifier, when the provider has one.
        id: Option<String>,
        /// The tool name.
        name: String,
        /// JSON arguments for the tool.
        args: Value,
    },
    /// The result of a tool call, sent back to the model.
    FunctionResponse {
        /// The identifier of the call this answers.
        id: Option<String>,
        /// The tool name.
        name: String,
        /// JSON result.
        response: Value,
    },
}

impl Part {
    /// The text of a [`Part::Text`], `None` for other parts.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

impl Content {
    /// Create an empty message for `role`.
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    /// Append a text part.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    /// Append an arbitrary part.
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenate all text parts. Empty when the message has no text.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("")
    }

    /// All function calls requested in this message, in order.
    pub fn function_calls(&self) -> Vec<(Option<&str>, &str, &Value)> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::FunctionCall { id, name, args } => Some((id.as_deref(), name.as_str(), args)),
                _ => None,
            })
            .collect()
    }
}
