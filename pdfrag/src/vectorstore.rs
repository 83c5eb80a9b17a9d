//! Vector store trait for storing and searching vector embeddings.

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s keyed by
/// [`Chunk::id`]. Upserting an id that already exists replaces the stored
/// entry, which is what makes re-ingestion idempotent. Concurrent upserts to
/// the same collection must be serialized by the implementation.
///
/// # Example
///
/// ```rust,ignore
/// use pdfrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.create_collection("docs", 1536).await?;
/// store.upsert("docs", &chunks).await?;
/// let results = store.search("docs", &query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Upsert chunks into a collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Number of entries stored in a collection.
    async fn count(&self, collection: &str) -> Result<usize>;
}

/// A vector store paired with the name of one of its collections.
///
/// This is the handle the pipeline writes to and reads from; obtain one with
/// [`Collection::get_or_create`].
#[derive(Clone)]
pub struct Collection {
    store: Arc<dyn VectorStore>,
    name: String,
}

impl Collection {
    /// Ensure `name` exists in `store` and return a handle to it.
    pub async fn get_or_create(
        store: Arc<dyn VectorStore>,
        name: impl Into<String>,
        dimensions: usize,
    ) -> Result<Self> {
        let name = name.into();
        store.create_collection(&name, dimensions).await?;
        Ok(Self { store, name })
    }

    /// The collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace entries in one store write.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        self.store.upsert(&self.name, chunks).await
    }

    /// The `top_k` nearest entries to `embedding`, nearest first.
    pub async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        self.store.search(&self.name, embedding, top_k).await
    }

    /// Number of stored entries.
    pub async fn count(&self) -> Result<usize> {
        self.store.count(&self.name).await
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score every chunk against `embedding` and keep the best `top_k`.
///
/// Equal scores are ordered by chunk id so results are reproducible.
pub(crate) fn rank<'a>(
    chunks: impl Iterator<Item = &'a Chunk>,
    embedding: &[f32],
    top_k: usize,
) -> Vec<SearchResult> {
    let mut scored: Vec<SearchResult> = chunks
        .map(|chunk| SearchResult {
            chunk: chunk.clone(),
            score: cosine_similarity(&chunk.embedding, embedding),
        })
        .collect();

    scored.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.chunk.id.cmp(&b.chunk.id)));
    scored.truncate(top_k);
    scored
}
