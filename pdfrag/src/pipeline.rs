//! Ingestion and retrieval orchestration.
//!
//! The [`RagPipeline`] composes a [`TextExtractor`], a [`Chunker`] and an
//! [`EmbeddingProvider`] and runs them against a [`Collection`]:
//!
//! - ingestion: extract → chunk → (embed → add) per chunk
//! - retrieval: embed query → nearest neighbors
//!
//! # Example
//!
//! ```rust,ignore
//! use pdfrag::{RagPipeline, RagConfig, LocalVectorStore, PdfExtractor, WordChunker};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(my_embedder))
//!     .build()?;
//!
//! let store = Arc::new(LocalVectorStore::open("./index").await?);
//! let collection = pipeline.open_collection(store).await?;
//! pipeline.ingest_directory(&collection, "./papers".as_ref(), &NoopObserver, &cancel).await?;
//! let results = pipeline.retrieve(&collection, "search query", 5).await?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::chunking::{Chunker, WordChunker};
use crate::config::RagConfig;
use crate::document::{Document, SearchResult, file_name};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::extract::{PageError, PdfExtractor, TextExtractor};
use crate::progress::ProgressObserver;
use crate::vectorstore::{Collection, VectorStore};

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentReport {
    /// Source identifier the chunk ids were derived from.
    pub source: String,
    /// Entries written (or overwritten) in the collection.
    pub entries: usize,
    /// Pages in the document.
    pub pages: usize,
    /// Pages that could not be read and were skipped.
    pub failed_pages: Vec<PageError>,
}

/// Outcome of ingesting a directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    /// One entry per processed document, in processing order.
    pub documents: Vec<DocumentReport>,
}

impl IngestReport {
    /// Entries written across all documents.
    pub fn entries(&self) -> usize {
        self.documents.iter().map(|d| d.entries).sum()
    }

    /// Documents that produced no chunks.
    pub fn empty_documents(&self) -> usize {
        self.documents.iter().filter(|d| d.entries == 0).count()
    }

    /// Pages skipped across all documents.
    pub fn failed_pages(&self) -> usize {
        self.documents.iter().map(|d| d.failed_pages.len()).sum()
    }
}

/// The RAG pipeline orchestrator.
///
/// Holds no index state of its own; every operation takes the
/// [`Collection`] it should work on. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    chunker: Arc<dyn Chunker>,
    extractor: Arc<dyn TextExtractor>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Get or create the configured collection in `store`.
    ///
    /// The collection is created with the dimensionality reported by the
    /// embedding provider.
    pub async fn open_collection(&self, store: Arc<dyn VectorStore>) -> Result<Collection> {
        let name = self.config.collection.clone();
        let dimensions = self.embedding_provider.dimensions();
        Collection::get_or_create(store, name.clone(), dimensions).await.map_err(|e| {
            error!(collection = %name, error = %e, "failed to open collection");
            e
        })
    }

    /// Chunk an already-extracted document, embed every chunk, then add them
    /// to the collection in a single write.
    ///
    /// Returns the number of entries written. A document with no words
    /// writes nothing and is not an error. `cancel` is checked before every
    /// chunk; a cancelled document writes nothing.
    pub async fn ingest_document(
        &self,
        collection: &Collection,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let chunks = self.chunker.chunk(document);
        if chunks.is_empty() {
            info!(source = %document.source, chunk_count = 0, "ingested document (empty)");
            return Ok(0);
        }

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            if cancel.is_cancelled() {
                info!(source = %document.source, "ingestion cancelled");
                return Err(RagError::Cancelled);
            }

            let embedding = self.embedding_provider.embed(&chunk.text).await.map_err(|e| {
                error!(
                    source = %document.source,
                    chunk = chunk.index,
                    error = %e,
                    "embedding failed during ingestion"
                );
                e
            })?;
            embedded.push(chunk.with_embedding(embedding));
        }

        collection.add(&embedded).await.map_err(|e| {
            error!(source = %document.source, error = %e, "add failed during ingestion");
            e
        })?;

        let chunk_count = embedded.len();
        info!(source = %document.source, chunk_count, "ingested document");
        Ok(chunk_count)
    }

    /// Extract, chunk, embed and add one file.
    ///
    /// `source` is the identifier mixed into chunk ids; pass `None` to use the
    /// path as given.
    pub async fn ingest_file(
        &self,
        collection: &Collection,
        path: &Path,
        source: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DocumentReport> {
        if cancel.is_cancelled() {
            return Err(RagError::Cancelled);
        }

        let extractor = Arc::clone(&self.extractor);
        let owned = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&owned))
            .await
            .map_err(|e| RagError::PipelineError(format!("extraction task failed: {e}")))??;

        let mut document = Document::new(path, extracted.text);
        if let Some(source) = source {
            document = document.with_source(source);
        }

        let entries = self.ingest_document(collection, &document, cancel).await?;
        Ok(DocumentReport {
            source: document.source,
            entries,
            pages: extracted.pages,
            failed_pages: extracted.failed_pages,
        })
    }

    /// Ingest every PDF directly inside `dir`.
    ///
    /// Chunk ids are keyed by file name. Progress is reported after each
    /// document; processing stops at the first error.
    pub async fn ingest_directory(
        &self,
        collection: &Collection,
        dir: &Path,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let files = discover_pdfs(dir)?;
        let total = files.len();
        observer.progress(0, total);
        info!(dir = %dir.display(), total, "ingesting directory");

        let mut report = IngestReport::default();
        for (done, path) in files.iter().enumerate() {
            let name = file_name(path);
            observer.status(&format!("Processing {name}..."));
            let document = self.ingest_file(collection, path, Some(&name), cancel).await?;
            report.documents.push(document);
            observer.progress(done + 1, total);
        }

        info!(
            dir = %dir.display(),
            documents = report.documents.len(),
            entries = report.entries(),
            "ingested directory"
        );
        Ok(report)
    }

    /// Embed `query` and return the `top_k` nearest chunks, nearest first.
    pub async fn retrieve(
        &self,
        collection: &Collection,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let query_embedding = self.embedding_provider.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during query");
            e
        })?;

        let results = collection.query(&query_embedding, top_k).await.map_err(|e| {
            error!(collection = collection.name(), error = %e, "vector store search failed");
            e
        })?;

        debug!(
            collection = collection.name(),
            top_k,
            result_count = results.len(),
            "retrieval completed"
        );
        Ok(results)
    }
}

/// PDF files directly inside `dir` (no recursion), sorted by path.
///
/// The extension match is case-insensitive.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(RagError::PipelineError(format!("'{}' is not a directory", dir.display())));
    }

    let mut files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.into_path())
        .collect::<Vec<_>>();

    files.sort();
    Ok(files)
}

/// Builder for constructing a [`RagPipeline`].
///
/// Only the embedding provider is required; the chunker defaults to a
/// [`WordChunker`] sized by `config.chunk_size` and the extractor to
/// [`PdfExtractor`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    chunker: Option<Arc<dyn Chunker>>,
    extractor: Option<Arc<dyn TextExtractor>>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Replace the default chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Replace the default text extractor.
    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the embedding provider is missing or
    /// the configuration is invalid.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::ConfigError("embedding_provider is required".to_string()))?;
        let chunker =
            self.chunker.unwrap_or_else(|| Arc::new(WordChunker::new(config.chunk_size)));
        let extractor = self.extractor.unwrap_or_else(|| Arc::new(PdfExtractor));

        Ok(RagPipeline { config, embedding_provider, chunker, extractor })
    }
}
