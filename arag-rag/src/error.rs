//! Error types for the `arag-rag` crate.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while loading, chunking, embedding or retrieving.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source string matched none of the supported shapes.
    #[error("Unsupported source: {location}")]
    UnsupportedSource {
        /// The offending source, as given.
        location: String,
    },

    /// Reading or fetching a source failed.
    #[error("Failed to load '{location}': {message}")]
    Load {
        /// The source being loaded.
        location: String,
        /// A description of the failure.
        message: String,
    },

    /// A bounded external call did not finish in time.
    #[error("{service} request timed out after {}s", .after.as_secs())]
    Timeout {
        /// The remote service that was called.
        service: String,
        /// The timeout that expired.
        after: Duration,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether a later attempt may succeed.
        retryable: bool,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// Retrieval was attempted before the index was built.
    #[error("Embedding index has not been built")]
    IndexNotInitialized,

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error propagated from `arag-core`.
    #[error(transparent)]
    Core(#[from] arag_core::AragError),
}

impl RagError {
    /// Whether retrying the failed call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::EmbeddingError { retryable, .. } => *retryable,
            Self::Core(err) => err.is_retryable(),
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
