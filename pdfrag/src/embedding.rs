//! The embedding capability consumed by ingestion and retrieval.

use async_trait::async_trait;

use crate::error::Result;

/// Maps a piece of text to a fixed-length vector.
///
/// The pipeline calls [`embed`](EmbeddingProvider::embed) once per chunk
/// during ingestion and once per query during retrieval. Failures must come
/// back as [`RagError::EmbeddingError`](crate::RagError::EmbeddingError) so callers can
/// tell them apart from index or configuration problems. Providers do not
/// retry on their own; wrap them in
/// [`RetryingEmbedder`](crate::RetryingEmbedder) for that.
///
/// # Example
///
/// ```rust,ignore
/// use pdfrag::EmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, in order. Sequential unless a provider batches.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}
