//! Error types for the workflow.

use arag_core::AragError;
use arag_rag::RagError;
use thiserror::Error;

use crate::state::Phase;

/// Errors raised while running the workflow.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The retrieve stage failed.
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RagError),

    /// The compose stage failed.
    #[error("Answer composition failed: {0}")]
    Composition(#[from] AragError),

    /// A stage was entered in the wrong phase, or left the state in a phase
    /// other than the one it is responsible for.
    #[error("Stage '{stage}' cannot move state from {from} (expected {expected})")]
    InvalidTransition {
        /// The stage being run.
        stage: String,
        /// The phase the state was in.
        from: Phase,
        /// The phase the stage requires.
        expected: Phase,
    },
}

pub type Result<T> = std::result::Result<T, GraphError>;
