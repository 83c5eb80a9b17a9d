//! Data types for documents, chunks, and search results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A source document read from disk.
///
/// Documents only live for the duration of one ingestion run; once chunked
/// they are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Where the document was read from.
    pub path: PathBuf,
    /// Identifier mixed into every chunk id derived from this document.
    pub source: String,
    /// Extracted and normalized text.
    pub text: String,
}

impl Document {
    /// Create a document whose source identifier is the path as given.
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let path = path.into();
        let source = path.to_string_lossy().into_owned();
        Self { path, source, text: text.into() }
    }

    /// Override the source identifier (directory ingestion keys chunks by file name).
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// The file name component of the path, or the whole path when it has none.
    pub fn display_name(&self) -> String {
        file_name(&self.path)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// A run of at most `chunk_size` words from one [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Stable identifier, see [`chunk_id`].
    pub id: String,
    /// The words of the chunk joined by single spaces.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until embedded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Source identifier of the parent document.
    pub source: String,
    /// Position of this chunk within its document.
    pub index: usize,
}

impl Chunk {
    /// Create an un-embedded chunk, deriving its id from `text` and `source`.
    pub fn new(text: impl Into<String>, source: impl Into<String>, index: usize) -> Self {
        let text = text.into();
        let source = source.into();
        Self { id: chunk_id(&text, &source), text, embedding: Vec::new(), source, index }
    }

    /// Attach an embedding.
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}

/// Derive the index key for a chunk: hex SHA-256 of the chunk text followed by
/// the source identifier.
///
/// The same (text, source) pair maps to the same id in every process, so
/// re-ingesting a document overwrites its entries instead of duplicating them.
pub fn chunk_id(text: &str, source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}
