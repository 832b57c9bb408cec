//! Answer composition.
//!
//! [`AnswerComposer`] owns a [`ReactAgent`] that is built on first use and
//! then shared by every subsequent question.

use std::sync::Arc;

use arag_core::{GenerateContentConfig, Llm, Result, Tool};
use arag_rag::{Chunk, Retriever, RetrieverTool};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::react::{DEFAULT_MAX_ITERATIONS, ReactAgent, StopReason};

/// System directive given to the answering agent.
pub const SYSTEM_PROMPT: &str = "You are a helpful RAG agent. Prefer 'retriever' for user-provided docs; \
use 'wikipedia' for general knowledge. Return only the final useful answer.";

/// Returned when the agent produces no usable text.
pub const FALLBACK_ANSWER: &str = "Could not generate answer.";

const AGENT_NAME: &str = "rag_agent";

/// Produces answers with a tool-using agent over the indexed corpus.
pub struct AnswerComposer {
    model: Arc<dyn Llm>,
    retriever: Retriever,
    knowledge_tool: Arc<dyn Tool>,
    max_iterations: usize,
    generate_config: Option<GenerateContentConfig>,
    agent: OnceCell<ReactAgent>,
}

impl AnswerComposer {
    /// `knowledge_tool` is the general-knowledge tool, normally a
    /// [`WikipediaTool`](crate::WikipediaTool).
    pub fn new(model: Arc<dyn Llm>, retriever: Retriever, knowledge_tool: Arc<dyn Tool>) -> Self {
        Self {
            model,
            retriever,
            knowledge_tool,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            generate_config: None,
            agent: OnceCell::new(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sampling settings sent with every model call of the agent.
    pub fn with_generate_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_config = Some(config);
        self
    }

    /// Whether the agent has been built yet.
    pub fn is_agent_built(&self) -> bool {
        self.agent.initialized()
    }

    async fn agent(&self) -> Result<&ReactAgent> {
        self.agent
            .get_or_try_init(|| async {
                info!(model = self.model.name(), "building answer agent");
                let mut builder = ReactAgent::builder(AGENT_NAME)
                    .model(Arc::clone(&self.model))
                    .instruction(SYSTEM_PROMPT)
                    .tool(Arc::new(RetrieverTool::new(self.retriever.clone())))
                    .tool(Arc::clone(&self.knowledge_tool))
                    .max_iterations(self.max_iterations);
                if let Some(config) = &self.generate_config {
                    builder = builder.generate_content_config(config.clone());
                }
                builder.build()
            })
            .await
    }

    /// Answer `question`.
    ///
    /// `retrieved` is the retrieve stage's output. The agent looks passages
    /// up itself through the `retriever` tool, so it is only logged here.
    ///
    /// # Errors
    ///
    /// Fails if the agent cannot be built or the model call fails. An agent
    /// run that ends without text yields [`FALLBACK_ANSWER`], not an error.
    pub async fn compose(&self, question: &str, retrieved: &[Chunk]) -> Result<String> {
        debug!(question, retrieved = retrieved.len(), "composing answer");
        let agent = self.agent().await?;
        let run = agent.run(question).await?;

        if run.stop_reason == StopReason::MaxIterations {
            warn!(iterations = run.iterations, "answer agent hit its iteration limit");
        }

        match run.final_text() {
            Some(answer) => {
                info!(iterations = run.iterations, answer_len = answer.len(), "answer composed");
                Ok(answer)
            }
            None => {
                warn!(iterations = run.iterations, "agent produced no answer text");
                Ok(FALLBACK_ANSWER.to_string())
            }
        }
    }
}
