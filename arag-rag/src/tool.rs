//! Retrieval exposed as an agent tool.
//!
//! The [`RetrieverTool`] wraps a [`Retriever`] as an [`arag_core::Tool`] so
//! that agents can query the indexed corpus themselves.
//!
//! # Example
//!
//! ```rust,ignore
//! use arag_rag::{Retriever, RetrieverTool};
//!
//! let tool = RetrieverTool::new(retriever);
//! // The agent calls the tool with: { "query": "How do agents plan?" }
//! ```

use arag_core::{AragError, Tool};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{error, info};

use crate::document::Chunk;
use crate::index::Retriever;

/// Maximum number of passages included in one tool result.
pub const MAX_PASSAGES: usize = 8;

/// Returned when a query matches nothing.
pub const NO_DOCUMENTS: &str = "No documents found.";

/// A retrieval tool over the indexed corpus, named `retriever`.
pub struct RetrieverTool {
    retriever: Retriever,
}

impl RetrieverTool {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }
}

/// Render passages as numbered, titled blocks separated by blank lines.
///
/// Each block is `[{i}] {title}\n{text}` with `i` starting at 1. The title is
/// the chunk's `title` metadata, else its `source`, else `doc_{i}`.
pub fn format_passages(chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return NO_DOCUMENTS.to_string();
    }
    chunks
        .iter()
        .take(MAX_PASSAGES)
        .enumerate()
        .map(|(i, chunk)| {
            let n = i + 1;
            let title = chunk.title().map(str::to_string).unwrap_or_else(|| format!("doc_{n}"));
            format!("[{n}] {title}\n{}", chunk.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        "retriever"
    }

    fn description(&self) -> &str {
        "Fetch passages from indexed corpus."
    }

    fn parameters_schema(&self) -> Option<Value> {
        Some(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look up in the indexed documents"
                }
            },
            "required": ["query"]
        }))
    }

    async fn execute(&self, args: Value) -> arag_core::Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AragError::Tool("missing required 'query' parameter".into()))?;

        info!(query, k = self.retriever.k(), "retriever tool called");

        let chunks = self.retriever.invoke(query).await.map_err(|e| {
            error!(error = %e, "retriever tool failed");
            AragError::Tool(format!("retrieval failed: {e}"))
        })?;

        Ok(Value::String(format_passages(&chunks)))
    }
}
