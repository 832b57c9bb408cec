//! Error types shared by model clients, tools and agents.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by language models, tools and the agent loop.
#[derive(Debug, Error)]
pub enum AragError {
    /// A model inference call failed.
    #[error("Model error: {0}")]
    Model(String),

    /// A model inference call failed with a retryable condition
    /// (rate limiting or a server-side error).
    #[error("Model error (transient): {0}")]
    ModelTransient(String),

    /// A tool call failed.
    #[error("Tool error: {0}")]
    Tool(String),

    /// The agent could not be built or run.
    #[error("Agent error: {0}")]
    Agent(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An external call did not complete within its time budget.
    #[error("{service} request timed out after {}s", .after.as_secs())]
    Timeout {
        /// The external service that was called.
        service: String,
        /// The configured time budget.
        after: Duration,
    },
}

impl AragError {
    /// Whether retrying the failed operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ModelTransient(_) | Self::Timeout { .. })
    }
}

/// A convenience result type for core operations.
pub type Result<T> = std::result::Result<T, AragError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors_are_retryable() {
        assert!(AragError::ModelTransient("429".into()).is_retryable());
        assert!(
            AragError::Timeout { service: "gemini".into(), after: Duration::from_secs(5) }
                .is_retryable()
        );
        assert!(!AragError::Model("bad request".into()).is_retryable());
        assert!(!AragError::Tool("boom".into()).is_retryable());
    }

    #[test]
    fn timeout_message_names_service() {
        let err = AragError::Timeout { service: "wikipedia".into(), after: Duration::from_secs(30) };
        assert_eq!(err.to_string(), "wikipedia request timed out after 30s");
    }
}
