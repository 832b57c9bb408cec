//! The retrieve-then-compose workflow.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use arag_agent::AnswerComposer;
use arag_rag::Retriever;
use tracing::{debug, info};

use crate::error::{GraphError, Result};
use crate::node::{ComposeNode, Node, RetrieveNode};
use crate::state::{Phase, RagState};

/// An ordered list of stages, run one after another on a fresh state.
pub struct CompiledGraph {
    stages: Vec<Arc<dyn Node>>,
}

impl CompiledGraph {
    pub fn new(stages: Vec<Arc<dyn Node>>) -> Self {
        Self { stages }
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage on a new state for `question` and return the final state.
    pub async fn invoke(&self, question: &str) -> Result<RagState> {
        let mut state = RagState::new(question);
        for stage in &self.stages {
            check(stage.name(), state.phase(), stage.input_phase())?;

            let started = Instant::now();
            state = stage.run(state).await?;
            debug!(stage = stage.name(), elapsed_ms = started.elapsed().as_millis() as u64, "stage finished");

            check(stage.name(), state.phase(), stage.output_phase())?;
        }
        Ok(state)
    }
}

fn check(stage: &str, from: Phase, expected: Phase) -> Result<()> {
    if from == expected {
        Ok(())
    } else {
        Err(GraphError::InvalidTransition { stage: stage.to_string(), from, expected })
    }
}

/// Assembles the `retriever -> responder` workflow.
///
/// The graph is compiled on the first call to [`GraphBuilder::build`] or
/// [`GraphBuilder::run`] and reused afterwards.
pub struct GraphBuilder {
    retriever: Retriever,
    composer: Arc<AnswerComposer>,
    graph: OnceLock<CompiledGraph>,
}

impl GraphBuilder {
    pub fn new(retriever: Retriever, composer: Arc<AnswerComposer>) -> Self {
        Self { retriever, composer, graph: OnceLock::new() }
    }

    pub fn is_built(&self) -> bool {
        self.graph.get().is_some()
    }

    pub fn build(&self) -> &CompiledGraph {
        self.graph.get_or_init(|| {
            info!("compiling workflow");
            CompiledGraph::new(vec![
                Arc::new(RetrieveNode::new(self.retriever.clone())),
                Arc::new(ComposeNode::new(Arc::clone(&self.composer))),
            ])
        })
    }

    /// Answer `question`, returning the terminal state.
    pub async fn run(&self, question: &str) -> Result<RagState> {
        let state = self.build().invoke(question).await?;
        info!(docs = state.docs().len(), "workflow finished");
        Ok(state)
    }
}
