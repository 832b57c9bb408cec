use std::fmt;

use arag_rag::Chunk;
use serde::{Deserialize, Serialize};

/// Progress of a question through the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Initial,
    Retrieved,
    /// Terminal.
    Answered,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Initial => write!(f, "initial"),
            Phase::Retrieved => write!(f, "retrieved"),
            Phase::Answered => write!(f, "answered"),
        }
    }
}

/// State carried through the workflow for one question.
///
/// `retrieved_docs` is only written by the retrieve stage and `answer` only
/// by the compose stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagState {
    pub question: String,
    pub retrieved_docs: Option<Vec<Chunk>>,
    pub answer: Option<String>,
}

impl RagState {
    pub fn new(question: impl Into<String>) -> Self {
        Self { question: question.into(), retrieved_docs: None, answer: None }
    }

    pub fn phase(&self) -> Phase {
        match (&self.retrieved_docs, &self.answer) {
            (_, Some(_)) => Phase::Answered,
            (Some(_), None) => Phase::Retrieved,
            (None, None) => Phase::Initial,
        }
    }

    /// Retrieved passages, empty before retrieval.
    pub fn docs(&self) -> &[Chunk] {
        self.retrieved_docs.as_deref().unwrap_or_default()
    }
}
