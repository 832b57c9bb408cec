//! In-memory vector store using exact cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a brute-force store backed by
//! a `Vec` protected by a `tokio::sync::RwLock`. Every search scores every
//! stored chunk, so results are exact.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const BACKEND: &str = "InMemory";

/// An in-memory vector store using cosine similarity for search.
///
/// Chunks are kept in insertion order. Results with equal scores are returned
/// in that order.
///
/// # Example
///
/// ```rust,ignore
/// use arag_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(&chunks).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<Vec<Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn dimension_mismatch(expected: usize, actual: usize) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("embedding has {actual} dimensions, store holds {expected}"),
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        let mut stored = self.chunks.write().await;
        let expected = stored.first().map(|c| c.embedding.len());

        for chunk in chunks {
            if chunk.embedding.is_empty() {
                return Err(RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("chunk '{}' has no embedding", chunk.id),
                });
            }
            let width = expected.or_else(|| chunks.first().map(|c| c.embedding.len()));
            if let Some(width) = width.filter(|w| *w != chunk.embedding.len()) {
                return Err(dimension_mismatch(width, chunk.embedding.len()));
            }
        }

        stored.extend_from_slice(chunks);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let stored = self.chunks.read().await;
        if let Some(first) = stored.first().filter(|c| c.embedding.len() != embedding.len()) {
            return Err(dimension_mismatch(first.embedding.len(), embedding.len()));
        }

        let mut scored: Vec<SearchResult> = stored
            .iter()
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(&chunk.embedding, embedding),
            })
            .collect();

        // `sort_by` is stable, so ties keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn len(&self) -> usize {
        self.chunks.read().await.len()
    }
}
