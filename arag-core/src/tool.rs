//! The tool abstraction agents call into.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::model::FunctionDeclaration;

/// A named capability an agent can invoke.
///
/// # Example
///
/// ```rust,ignore
/// use arag_core::Tool;
///
/// let result = tool.execute(json!({ "query": "agent loop" })).await?;
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name the model uses to call it.
    fn name(&self) -> &str;

    /// Short description shown to the model.
    fn description(&self) -> &str;

    /// JSON schema of the arguments, if the tool takes any.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    /// Run the tool.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Describe this tool for a model's function-calling API.
    fn declaration(&self) -> FunctionDeclaration {
        FunctionDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}
