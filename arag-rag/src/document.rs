//! Data types for documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Metadata key holding the source a document was loaded from.
pub const META_SOURCE: &str = "source";
/// Metadata key holding a web page title.
pub const META_TITLE: &str = "title";
/// Metadata key holding a 0-based PDF page number.
pub const META_PAGE: &str = "page";

/// A unit of loaded text with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata (`source`, and `title` or `page` when known).
    pub metadata: HashMap<String, String>,
    /// Optional URI pointing to the original source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_uri: Option<String>,
}

impl Document {
    /// Create a document whose `source` metadata is `source`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut metadata = HashMap::new();
        metadata.insert(META_SOURCE.to_string(), source.clone());
        Self { id: id.into(), text: text.into(), metadata, source_uri: Some(source) }
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded window of a [`Document`], optionally carrying its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier, `{document_id}_{chunk_index}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    pub embedding: Vec<f32>,
    /// Metadata copied from the parent document.
    pub metadata: HashMap<String, String>,
    /// The ID of the parent [`Document`].
    pub document_id: String,
    /// Position of this chunk within its document.
    pub chunk_index: usize,
}

impl Chunk {
    /// The chunk's `title` metadata, falling back to `source`.
    pub fn title(&self) -> Option<&str> {
        [META_TITLE, META_SOURCE]
            .into_iter()
            .filter_map(|key| self.metadata.get(key))
            .map(String::as_str)
            .find(|value| !value.trim().is_empty())
    }
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
