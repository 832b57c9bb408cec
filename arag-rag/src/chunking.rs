//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`RecursiveChunker`] - splits on paragraphs, then lines, then words, then
//!   characters, merging pieces back up to the chunk size with overlap
//! - [`FixedSizeChunker`] - plain character windows with overlap
//!
//! All sizes are counted in `char`s, so multi-byte text is never cut inside a
//! code point.

use tracing::debug;

use crate::config::{RagConfig, validate_chunking};
use crate::document::{Chunk, Document};
use crate::error::Result;

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the index.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace text.
    /// Each returned chunk has an empty embedding vector.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Split every document with `chunker`, preserving document order.
pub fn split_documents(chunker: &dyn Chunker, documents: &[Document]) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents.iter().flat_map(|doc| chunker.chunk(doc)).collect();
    debug!(documents = documents.len(), chunks = chunks.len(), "split documents");
    chunks
}

fn make_chunks(document: &Document, texts: impl IntoIterator<Item = String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: format!("{}_{i}", document.id),
            text,
            embedding: Vec::new(),
            metadata: document.metadata.clone(),
            document_id: document.id.clone(),
            chunk_index: i,
        })
        .collect()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Splits text into fixed-size character windows with configurable overlap.
///
/// # Example
///
/// ```rust,ignore
/// use arag_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// Fails with [`RagError::ConfigError`](crate::RagError::ConfigError) unless
    /// `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = document.text.chars().collect();
        let step = self.chunk_size - self.chunk_overlap;
        let mut windows = Vec::new();
        let mut start = 0;

        loop {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect::<String>());
            if end == chars.len() {
                break;
            }
            start += step;
        }

        make_chunks(document, windows)
    }
}

/// Default separators, coarsest first. The empty separator splits into
/// individual characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Splits text hierarchically: paragraphs, lines, words, then characters.
///
/// Text is split on the coarsest separator it contains, with each separator
/// kept at the start of the piece that follows it. Pieces that are still too
/// long are split again with the next separator. Neighbouring pieces are then
/// merged greedily into chunks of at most `chunk_size` characters; when a
/// chunk is emitted, trailing pieces totalling at most `chunk_overlap`
/// characters are carried into the next one. Chunks are whitespace-trimmed
/// and empty chunks are dropped.
///
/// # Example
///
/// ```rust,ignore
/// use arag_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// Fails with [`RagError::ConfigError`](crate::RagError::ConfigError) unless
    /// `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the sizes in `config`.
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, remaining) = pick_separator(text, separators);

        let mut chunks = Vec::new();
        let mut short_pieces: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short_pieces.push(piece);
                continue;
            }
            if !short_pieces.is_empty() {
                chunks.extend(self.merge(&short_pieces));
                short_pieces.clear();
            }
            if remaining.is_empty() {
                // Only single characters reach this point.
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !short_pieces.is_empty() {
            chunks.extend(self.merge(&short_pieces));
        }
        chunks
    }

    /// Greedily join pieces into chunks, carrying up to `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<(&str, usize)> = Vec::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_joined(&mut chunks, &window);
                while total > self.chunk_overlap
                    || (total > 0 && total + len > self.chunk_size)
                {
                    let (_, dropped) = window.remove(0);
                    total -= dropped;
                }
            }
            window.push((piece, len));
            total += len;
        }

        push_joined(&mut chunks, &window);
        chunks
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.trim().is_empty() {
            return Vec::new();
        }
        make_chunks(document, self.split_text(&document.text))
    }
}

fn push_joined(chunks: &mut Vec<String>, window: &[(&str, usize)]) {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Pick the first separator present in `text`, returning it with the finer
/// separators that follow it.
fn pick_separator<'s>(text: &str, separators: &'s [&'s str]) -> (&'s str, &'s [&'s str]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return ("", &[]);
        }
        if text.contains(separator) {
            return (separator, &separators[i + 1..]);
        }
    }
    ("", &[])
}

/// Split text at a separator, keeping the separator attached to the following
/// segment. The empty separator yields individual characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut result = Vec::new();
    let mut start = 0;
    let mut search_from = 0;

    while let Some(pos) = text[search_from..].find(separator) {
        let at = search_from + pos;
        if at > start {
            result.push(&text[start..at]);
        }
        start = at;
        search_from = at + separator.len();
    }

    if start < text.len() {
        result.push(&text[start..]);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("doc", text, "notes.txt").with_metadata("title", "Notes")
    }

    #[test]
    fn constructors_validate_sizes() {
        assert!(RecursiveChunker::new(10, 10).is_err());
        assert!(RecursiveChunker::new(0, 0).is_err());
        assert!(FixedSizeChunker::new(10, 12).is_err());
        assert!(RecursiveChunker::new(10, 0).is_ok());
    }

    #[test]
    fn separator_attaches_to_following_piece() {
        assert_eq!(split_keeping_separator("a b c", " "), vec!["a", " b", " c"]);
        assert_eq!(split_keeping_separator("\n\nx\n\ny", "\n\n"), vec!["\n\nx", "\n\ny"]);
        assert_eq!(split_keeping_separator("héllo", ""), vec!["h", "é", "l", "l", "o"]);
    }

    #[test]
    fn short_text_is_a_single_trimmed_chunk() {
        let chunker = RecursiveChunker::new(500, 50).unwrap();
        let chunks = chunker.chunk(&doc("  Agents use an agent loop.\n"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Agents use an agent loop.");
        assert_eq!(chunks[0].id, "doc_0");
        assert_eq!(chunks[0].metadata.get("title").map(String::as_str), Some("Notes"));
    }

    #[test]
    fn paragraphs_are_preferred_split_points() {
        let chunker = RecursiveChunker::new(30, 0).unwrap();
        let text = "First paragraph is here.\n\nSecond paragraph is here.";
        assert_eq!(
            chunker.split_text(text),
            vec!["First paragraph is here.", "Second paragraph is here."]
        );
    }

    #[test]
    fn words_overlap_between_chunks() {
        let chunker = RecursiveChunker::new(11, 5).unwrap();
        let chunks = chunker.split_text("one two three four");
        // " three" plus " four" would exceed the overlap, so nothing is carried.
        assert_eq!(chunks, vec!["one two", "two three", "four"]);
    }

    #[test]
    fn long_words_fall_back_to_characters() {
        let chunker = RecursiveChunker::new(4, 0).unwrap();
        assert_eq!(chunker.split_text("abcdefghij"), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn lengths_are_counted_in_chars() {
        let chunker = RecursiveChunker::new(3, 0).unwrap();
        for chunk in chunker.split_text("日本語のテキスト") {
            assert!(chunk.chars().count() <= 3);
        }
    }

    #[test]
    fn blank_document_has_no_chunks() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&doc(" \n\n ")).is_empty());
        assert!(FixedSizeChunker::new(10, 2).unwrap().chunk(&doc("")).is_empty());
    }

    #[test]
    fn fixed_windows_stride_by_size_minus_overlap() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let texts: Vec<String> =
            chunker.chunk(&doc("abcdefghij")).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn split_documents_keeps_document_order() {
        let chunker = RecursiveChunker::new(100, 0).unwrap();
        let docs = vec![
            Document::new("a", "alpha", "a.txt"),
            Document::new("b", "beta", "b.txt"),
        ];
        let chunks = split_documents(&chunker, &docs);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].document_id, "a");
        assert_eq!(chunks[1].document_id, "b");
        assert_eq!(chunks[1].metadata.get("source").map(String::as_str), Some("b.txt"));
    }
}
