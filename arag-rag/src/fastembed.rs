//! Local sentence embeddings with fastembed (ONNX Runtime).
//!
//! This module is only available when the `fastembed` feature is enabled.
//! The model is downloaded from Hugging Face on first use and cached on disk.

use std::sync::Arc;

use async_trait::async_trait;
use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "fastembed";

/// An [`EmbeddingProvider`] running `all-MiniLM-L6-v2` locally.
///
/// Inference is CPU-bound, so every call runs on the blocking thread pool.
pub struct FastEmbedProvider {
    model: Arc<TextEmbedding>,
    batch_size: Option<usize>,
}

impl FastEmbedProvider {
    /// Output width of all-MiniLM-L6-v2.
    const DIMENSIONS: usize = 384;

    /// Load the model, downloading it if it is not cached yet.
    pub fn new() -> Result<Self> {
        info!(provider = PROVIDER, model = "all-MiniLM-L6-v2", "loading embedding model");
        let model = TextEmbedding::try_new(InitOptions::new(EmbeddingModel::AllMiniLML6V2))
            .map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("failed to load model: {e}"),
                retryable: false,
            })?;
        Ok(Self { model: Arc::new(model), batch_size: None })
    }

    /// Set the ONNX batch size used for large inputs.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| {
            RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: "model returned no embedding".into(),
                retryable: false,
            }
        })
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(provider = PROVIDER, batch_size = texts.len(), "embedding batch");

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let batch_size = self.batch_size;

        tokio::task::spawn_blocking(move || model.embed(owned, batch_size))
            .await
            .map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: format!("embedding task failed: {e}"),
                retryable: false,
            })?
            .map_err(|e| RagError::EmbeddingError {
                provider: PROVIDER.into(),
                message: e.to_string(),
                retryable: false,
            })
    }

    fn dimensions(&self) -> usize {
        Self::DIMENSIONS
    }
}
