//! # arag-rag
//!
//! Document ingestion and embedding retrieval for the Agentic RAG workspace.
//!
//! The crate covers the path from raw sources to ranked passages:
//!
//! 1. [`DocumentLoader`] turns URLs, PDFs and text files into [`Document`]s
//! 2. a [`Chunker`] (normally [`RecursiveChunker`]) splits them into bounded,
//!    overlapping [`Chunk`]s
//! 3. [`EmbeddingIndex`] embeds the chunks with an [`EmbeddingProvider`] and
//!    stores them in a [`VectorStore`]
//! 4. [`Retriever`] answers top-k queries, and [`RetrieverTool`] exposes it
//!    to agents
//!
//! ## Features
//!
//! - `gemini` - [`GeminiEmbeddingProvider`](gemini::GeminiEmbeddingProvider)
//! - `fastembed` - [`FastEmbedProvider`](fastembed::FastEmbedProvider), local ONNX inference
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use arag_rag::*;
//!
//! let docs = DocumentLoader::new(LoaderConfig::default())?
//!     .load(&["notes.txt".to_string()])
//!     .await?;
//! let chunks = split_documents(&RecursiveChunker::new(500, 50)?, &docs);
//!
//! let index = Arc::new(EmbeddingIndex::new(
//!     Arc::new(HashingEmbeddingProvider::default()),
//!     Arc::new(InMemoryVectorStore::new()),
//! ));
//! index.build(chunks).await?;
//!
//! let passages = Retriever::new(index, 4).invoke("What is an agent loop?").await?;
//! ```

pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod hashing;
pub mod index;
pub mod inmemory;
pub mod loader;
pub mod tool;
pub mod vectorstore;

#[cfg(feature = "fastembed")]
pub mod fastembed;
#[cfg(feature = "gemini")]
pub mod gemini;

pub use chunking::{Chunker, FixedSizeChunker, RecursiveChunker, split_documents};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use hashing::HashingEmbeddingProvider;
pub use index::{EmbeddingIndex, Retriever};
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, LoaderConfig, Source};
pub use tool::RetrieverTool;
pub use vectorstore::VectorStore;
