//! Durable vector store kept in a directory on the local filesystem.
//!
//! Each collection is one JSON file, `<name>.json`, holding its dimensionality
//! and every entry. Files are loaded when the store is opened and rewritten
//! through a temporary file and a rename after every change, so a crash never
//! leaves a half-written collection behind.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::validate_collection_name;
use crate::document::{Chunk, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, rank};

const BACKEND: &str = "local";
const EXTENSION: &str = "json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    dimensions: usize,
    entries: BTreeMap<String, Chunk>,
}

/// A [`VectorStore`] persisted under a caller-chosen directory.
///
/// Reopening the same directory yields the same collections with identical
/// contents.
///
/// # Example
///
/// ```rust,ignore
/// use pdfrag::LocalVectorStore;
///
/// let store = LocalVectorStore::open("./index").await?;
/// store.create_collection("document_chunks", 1536).await?;
/// ```
#[derive(Debug)]
pub struct LocalVectorStore {
    root: PathBuf,
    collections: RwLock<HashMap<String, CollectionFile>>,
}

impl LocalVectorStore {
    /// Open (creating if needed) the store rooted at `root` and load every
    /// collection file found there.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;

        let mut collections = HashMap::new();
        let mut dir = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != EXTENSION) {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if validate_collection_name(name).is_err() {
                continue;
            }
            let raw = tokio::fs::read(&path).await?;
            let file: CollectionFile = serde_json::from_slice(&raw).map_err(|e| {
                RagError::VectorStoreError {
                    backend: BACKEND.to_string(),
                    message: format!("corrupt collection file {}: {e}", path.display()),
                }
            })?;
            debug!(collection = name, entries = file.entries.len(), "loaded collection");
            collections.insert(name.to_string(), file);
        }

        info!(root = %root.display(), collections = collections.len(), "opened local vector store");
        Ok(Self { root, collections: RwLock::new(collections) })
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{EXTENSION}"))
    }

    async fn persist(&self, name: &str, file: &CollectionFile) -> Result<()> {
        let path = self.collection_path(name);
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        let bytes = serde_json::to_vec(file)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

fn mismatch(collection: &str, got: usize, expected: usize) -> RagError {
    RagError::VectorStoreError {
        backend: BACKEND.to_string(),
        message: format!(
            "collection '{collection}' holds {expected}-dimensional vectors, got {got}"
        ),
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        validate_collection_name(name)?;
        let mut collections = self.collections.write().await;
        if let Some(existing) = collections.get_mut(name) {
            if existing.dimensions > 0 && dimensions > 0 && existing.dimensions != dimensions {
                return Err(mismatch(name, dimensions, existing.dimensions));
            }
            if existing.dimensions == 0 && dimensions > 0 {
                let next = CollectionFile { dimensions, entries: existing.entries.clone() };
                self.persist(name, &next).await?;
                *existing = next;
            }
            return Ok(());
        }

        let file = CollectionFile { dimensions, entries: BTreeMap::new() };
        self.persist(name, &file).await?;
        collections.insert(name.to_string(), file);
        debug!(collection = name, dimensions, "created collection");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut collections = self.collections.write().await;
        let file = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        if let Some(chunk) = chunks
            .iter()
            .find(|c| file.dimensions > 0 && c.embedding.len() != file.dimensions)
        {
            return Err(RagError::VectorStoreError {
                backend: BACKEND.to_string(),
                message: format!(
                    "chunk '{}' has {} dimensions, collection '{collection}' expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    file.dimensions
                ),
            });
        }

        // Memory only changes once the new contents are on disk.
        let mut entries = file.entries.clone();
        for chunk in chunks {
            entries.insert(chunk.id.clone(), chunk.clone());
        }
        let next = CollectionFile { dimensions: file.dimensions, entries };
        self.persist(collection, &next).await?;
        *file = next;

        debug!(collection, count = chunks.len(), "upserted chunks");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let file = collections.get(collection).ok_or_else(|| missing(collection))?;
        if file.dimensions > 0 && embedding.len() != file.dimensions {
            return Err(mismatch(collection, embedding.len(), file.dimensions));
        }
        Ok(rank(file.entries.values(), embedding, top_k))
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|file| file.entries.len())
            .ok_or_else(|| missing(collection))
    }
}
