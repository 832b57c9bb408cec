//! Wiring of loader, index, composer and workflow into one application.

use std::sync::Arc;

use arag_agent::{AnswerComposer, FALLBACK_ANSWER, WikipediaConfig, WikipediaTool};
use arag_core::{AragError, GenerateContentConfig, Llm, RetryPolicy, Tool};
use arag_graph::{GraphBuilder, GraphError, RagState};
use arag_model::{GeminiConfig, GeminiModel};
use arag_rag::gemini::GeminiEmbeddingProvider;
use arag_rag::{
    Document, DocumentLoader, EmbeddingIndex, EmbeddingProvider, HashingEmbeddingProvider,
    InMemoryVectorStore, LoaderConfig, RagConfig, RagError, RecursiveChunker, Retriever,
    split_documents,
};
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, ConfigError, EmbeddingBackend};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Model(#[from] AragError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Console error: {0}")]
    Console(#[from] rustyline::error::ReadlineError),
}

/// Something that can answer a question with the full workflow.
#[async_trait]
pub trait RagService: Send + Sync {
    async fn run(&self, question: &str) -> Result<RagState, GraphError>;

    /// Answer text of [`RagService::run`].
    async fn ask(&self, question: &str) -> Result<String, GraphError> {
        let state = self.run(question).await?;
        Ok(state.answer.unwrap_or_else(|| FALLBACK_ANSWER.to_string()))
    }
}

/// The assembled question-answering pipeline.
pub struct AgenticRag {
    graph: GraphBuilder,
    chunk_count: usize,
}

impl AgenticRag {
    /// Load `sources`, index them and prepare the workflow.
    ///
    /// # Errors
    ///
    /// Fails on the first source that cannot be loaded, or when the model or
    /// embedding provider cannot be created.
    pub async fn initialize(config: &AppConfig, sources: &[String]) -> Result<Self, AppError> {
        info!(sources = sources.len(), model = %config.model, "initializing agentic RAG");

        let model = GeminiModel::new(
            GeminiConfig::new(&config.api_key, &config.model).with_timeout(config.request_timeout),
        )?;
        let embedder = embedding_provider(config)?;
        let knowledge_tool = WikipediaTool::new(
            WikipediaConfig::default().with_timeout(config.request_timeout),
        )?;

        let loader = DocumentLoader::new(LoaderConfig {
            timeout: config.request_timeout,
            ..LoaderConfig::default()
        })?;
        let docs = loader.load(sources).await?;
        info!(documents = docs.len(), "sources loaded");

        Self::with_components(
            Arc::new(model),
            Arc::new(knowledge_tool),
            embedder,
            docs,
            &config.rag,
            config.max_agent_steps,
            config.generate_config(),
        )
        .await
    }

    /// Assemble the pipeline from already-constructed parts.
    pub async fn with_components(
        model: Arc<dyn Llm>,
        knowledge_tool: Arc<dyn Tool>,
        embedder: Arc<dyn EmbeddingProvider>,
        docs: Vec<Document>,
        rag: &RagConfig,
        max_agent_steps: usize,
        generate_config: Option<GenerateContentConfig>,
    ) -> Result<Self, AppError> {
        let chunker = RecursiveChunker::from_config(rag)?;
        let chunks = split_documents(&chunker, &docs);
        info!(chunks = chunks.len(), "documents split");

        let index = Arc::new(
            EmbeddingIndex::new(embedder, Arc::new(InMemoryVectorStore::new()))
                .with_embed_batch_size(rag.embed_batch_size),
        );
        let chunk_count = index.build(chunks).await?;

        let retriever = Retriever::new(index, rag.top_k);
        let mut composer = AnswerComposer::new(model, retriever.clone(), knowledge_tool)
            .with_max_iterations(max_agent_steps);
        if let Some(config) = generate_config {
            composer = composer.with_generate_config(config);
        }
        let graph = GraphBuilder::new(retriever, Arc::new(composer));
        graph.build();

        info!(chunk_count, "system initialized");
        Ok(Self { graph, chunk_count })
    }

    /// Number of indexed chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }
}

#[async_trait]
impl RagService for AgenticRag {
    /// Answer `question`, returning the full final state.
    async fn run(&self, question: &str) -> Result<RagState, GraphError> {
        self.graph.run(question).await
    }
}

fn embedding_provider(config: &AppConfig) -> Result<Arc<dyn EmbeddingProvider>, AppError> {
    let provider: Arc<dyn EmbeddingProvider> = match config.embedding {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbeddingProvider::default()),
        EmbeddingBackend::Gemini => Arc::new(
            GeminiEmbeddingProvider::new(&config.api_key)?
                .with_timeout(config.request_timeout)?
                .with_retry(RetryPolicy::default()),
        ),
        #[cfg(feature = "fastembed")]
        EmbeddingBackend::FastEmbed => Arc::new(arag_rag::fastembed::FastEmbedProvider::new()?),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingBackend::FastEmbed => {
            return Err(RagError::ConfigError(
                "EMBEDDING_PROVIDER=fastembed requires building with the `fastembed` feature".into(),
            )
            .into());
        }
    };
    info!(provider = provider.name(), dimensions = provider.dimensions(), "embedding provider ready");
    Ok(provider)
}
