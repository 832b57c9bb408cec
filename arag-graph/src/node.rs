//! Workflow stages.

use std::sync::Arc;

use arag_agent::AnswerComposer;
use arag_rag::Retriever;
use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::state::{Phase, RagState};

/// One stage of the workflow.
///
/// A stage runs on a state in [`Node::input_phase`] and must return a state
/// in [`Node::output_phase`].
#[async_trait]
pub trait Node: Send + Sync {
    fn name(&self) -> &str;

    fn input_phase(&self) -> Phase;

    fn output_phase(&self) -> Phase;

    async fn run(&self, state: RagState) -> Result<RagState>;
}

/// Fetches passages for the question.
pub struct RetrieveNode {
    retriever: Retriever,
}

impl RetrieveNode {
    pub fn new(retriever: Retriever) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Node for RetrieveNode {
    fn name(&self) -> &str {
        "retriever"
    }

    fn input_phase(&self) -> Phase {
        Phase::Initial
    }

    fn output_phase(&self) -> Phase {
        Phase::Retrieved
    }

    async fn run(&self, mut state: RagState) -> Result<RagState> {
        let docs = self.retriever.invoke(&state.question).await?;
        info!(docs = docs.len(), "retrieved passages");
        state.retrieved_docs = Some(docs);
        Ok(state)
    }
}

/// Produces the answer from the question and retrieved passages.
pub struct ComposeNode {
    composer: Arc<AnswerComposer>,
}

impl ComposeNode {
    pub fn new(composer: Arc<AnswerComposer>) -> Self {
        Self { composer }
    }
}

#[async_trait]
impl Node for ComposeNode {
    fn name(&self) -> &str {
        "responder"
    }

    fn input_phase(&self) -> Phase {
        Phase::Retrieved
    }

    fn output_phase(&self) -> Phase {
        Phase::Answered
    }

    async fn run(&self, mut state: RagState) -> Result<RagState> {
        let answer = self.composer.compose(&state.question, state.docs()).await?;
        state.answer = Some(answer);
        Ok(state)
    }
}
