//! Embedding index and its query-time view.
//!
//! The [`EmbeddingIndex`] embeds chunks once with an [`EmbeddingProvider`] and
//! stores them in a [`VectorStore`]. The [`Retriever`] wraps a shared index
//! with a default result count.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arag_rag::{EmbeddingIndex, HashingEmbeddingProvider, InMemoryVectorStore, Retriever};
//!
//! let index = EmbeddingIndex::new(
//!     Arc::new(HashingEmbeddingProvider::default()),
//!     Arc::new(InMemoryVectorStore::new()),
//! );
//! index.build(chunks).await?;
//!
//! let retriever = Retriever::new(Arc::new(index), 4);
//! let passages = retriever.invoke("What is an agent loop?").await?;
//! ```

use std::sync::{Arc, OnceLock};

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const DEFAULT_EMBED_BATCH_SIZE: usize = 64;

/// An index of embedded chunks supporting top-k similarity search.
///
/// The index is built exactly once and is read-only afterwards.
pub struct EmbeddingIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    embed_batch_size: usize,
    build_lock: Mutex<()>,
    built: OnceLock<usize>,
}

impl EmbeddingIndex {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            build_lock: Mutex::new(()),
            built: OnceLock::new(),
        }
    }

    /// Set how many chunks are sent to the provider per call (at least 1).
    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size.max(1);
        self
    }

    /// Return a reference to the embedding provider.
    pub fn embedding_provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Whether [`build`](Self::build) has succeeded.
    pub fn is_built(&self) -> bool {
        self.built.get().is_some()
    }

    /// Number of indexed chunks, `None` before the index is built.
    pub fn len(&self) -> Option<usize> {
        self.built.get().copied()
    }

    /// Embed `chunks` and store them. Returns the number of chunks indexed.
    ///
    /// An empty input builds an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the index was already built, and
    /// propagates embedding and storage failures. A failed build leaves the
    /// index uninitialized.
    pub async fn build(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        let _guard = self.build_lock.lock().await;
        if self.is_built() {
            return Err(RagError::ConfigError("embedding index is already built".to_string()));
        }

        for batch in chunks.chunks_mut(self.embed_batch_size) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
                error!(provider = self.embedder.name(), error = %e, "embedding failed during build");
            })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: self.embedder.name().to_string(),
                    message: format!(
                        "expected {} embeddings, got {}",
                        batch.len(),
                        embeddings.len()
                    ),
                    retryable: false,
                });
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
            debug!(batch_size = batch.len(), "embedded batch");
        }

        if !chunks.is_empty() {
            self.store.add(&chunks).await.inspect_err(|e| {
                error!(error = %e, "vector store insert failed during build");
            })?;
        }

        let count = chunks.len();
        let _ = self.built.set(count);
        info!(chunk_count = count, provider = self.embedder.name(), "embedding index built");
        Ok(count)
    }

    /// Return up to `k` chunks most similar to `query`, best first.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexNotInitialized`] before a successful build.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self.search(query, k).await?.into_iter().map(|r| r.chunk).collect())
    }

    /// Like [`retrieve`](Self::retrieve), keeping similarity scores.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        if !self.is_built() {
            return Err(RagError::IndexNotInitialized);
        }
        if k == 0 || self.store.is_empty().await {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during query");
        })?;
        let results = self.store.search(&query_embedding, k).await?;

        info!(result_count = results.len(), k, "query completed");
        Ok(results)
    }
}

/// The query-time view of an [`EmbeddingIndex`].
#[derive(Clone)]
pub struct Retriever {
    index: Arc<EmbeddingIndex>,
    k: usize,
}

impl Retriever {
    /// Default number of passages returned per query.
    pub const DEFAULT_K: usize = 4;

    pub fn new(index: Arc<EmbeddingIndex>, k: usize) -> Self {
        Self { index, k }
    }

    /// Return the top `k` chunks for `query`.
    pub async fn invoke(&self, query: &str) -> Result<Vec<Chunk>> {
        self.index.retrieve(query, self.k).await
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }
}
