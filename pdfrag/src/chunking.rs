//! Document chunking.
//!
//! Chunk size is measured in whitespace-separated words, never characters, so
//! a chunk boundary can never fall inside a word.

use crate::document::{Chunk, Document};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and ids but no embeddings.
/// Embeddings are attached later by the pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no words.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Groups consecutive words into chunks of at most `max_words` words.
///
/// # Example
///
/// ```rust,ignore
/// use pdfrag::WordChunker;
///
/// let chunker = WordChunker::new(500);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct WordChunker {
    max_words: usize,
}

impl WordChunker {
    /// Create a chunker emitting at most `max_words` words per chunk.
    ///
    /// A bound of zero is treated as one.
    pub fn new(max_words: usize) -> Self {
        Self { max_words: max_words.max(1) }
    }

    /// The configured bound.
    pub fn max_words(&self) -> usize {
        self.max_words
    }
}

impl Default for WordChunker {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Chunker for WordChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        split_words(&document.text, self.max_words)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk::new(text, document.source.clone(), index))
            .collect()
    }
}

/// Split `text` on whitespace and join every run of `max_words` words with a
/// single space. The last group may be shorter.
pub fn split_words(text: &str, max_words: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(max_words.max(1)).map(|group| group.join(" ")).collect()
}
