//! The session: explicit home of the active collection.
//!
//! A [`RagSession`] starts unconfigured. Ingestion, retrieval and answering
//! fail with [`RagError::NotConfigured`] until [`RagSession::configure`] (or
//! [`RagSession::configure_with_store`]) selects an index. Every public
//! operation reports its start, its success and its failure through the
//! [`ProgressObserver`] it is given, in addition to returning a `Result`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::document::{SearchResult, file_name};
use crate::error::{RagError, Result};
use crate::local::LocalVectorStore;
use crate::pipeline::{DocumentReport, IngestReport, RagPipeline};
use crate::progress::{ProgressObserver, StatusEvent};
use crate::synthesizer::{Answer, AnswerSynthesizer};
use crate::vectorstore::{Collection, VectorStore};

#[derive(Debug, Clone)]
enum SessionState {
    Unconfigured,
    Configured { collection: Collection, persist_path: Option<PathBuf> },
}

/// Process-wide context shared by the CLI and background tasks.
pub struct RagSession {
    pipeline: Arc<RagPipeline>,
    synthesizer: Arc<AnswerSynthesizer>,
    state: RwLock<SessionState>,
}

impl RagSession {
    /// Create an unconfigured session.
    pub fn new(pipeline: Arc<RagPipeline>, synthesizer: Arc<AnswerSynthesizer>) -> Self {
        Self { pipeline, synthesizer, state: RwLock::new(SessionState::Unconfigured) }
    }

    /// The pipeline this session drives.
    pub fn pipeline(&self) -> &Arc<RagPipeline> {
        &self.pipeline
    }

    /// Open the durable index under `persist_path` and select its collection.
    pub async fn configure(
        &self,
        persist_path: &Path,
        observer: &dyn ProgressObserver,
    ) -> Result<()> {
        let outcome = async {
            let store = Arc::new(LocalVectorStore::open(persist_path).await?);
            self.pipeline.open_collection(store).await
        }
        .await;

        match outcome {
            Ok(collection) => {
                info!(
                    path = %persist_path.display(),
                    collection = collection.name(),
                    "session configured"
                );
                *self.state.write().await = SessionState::Configured {
                    collection,
                    persist_path: Some(persist_path.to_path_buf()),
                };
                observer.status(&format!("Database loaded from: {}", persist_path.display()));
                Ok(())
            }
            Err(e) => {
                error!(path = %persist_path.display(), error = %e, "failed to open database");
                observer.status(&format!("Error loading database: {e}"));
                Err(e)
            }
        }
    }

    /// Select the configured collection inside an already-open store.
    pub async fn configure_with_store(&self, store: Arc<dyn VectorStore>) -> Result<()> {
        let collection = self.pipeline.open_collection(store).await?;
        *self.state.write().await = SessionState::Configured { collection, persist_path: None };
        Ok(())
    }

    /// Whether an index has been selected.
    pub async fn is_configured(&self) -> bool {
        matches!(*self.state.read().await, SessionState::Configured { .. })
    }

    /// Where the durable index lives, if the session was configured with one.
    pub async fn persist_path(&self) -> Option<PathBuf> {
        match &*self.state.read().await {
            SessionState::Configured { persist_path, .. } => persist_path.clone(),
            SessionState::Unconfigured => None,
        }
    }

    /// The active collection.
    ///
    /// # Errors
    ///
    /// [`RagError::NotConfigured`] before the session is configured.
    pub async fn collection(&self) -> Result<Collection> {
        match &*self.state.read().await {
            SessionState::Configured { collection, .. } => Ok(collection.clone()),
            SessionState::Unconfigured => Err(RagError::NotConfigured(
                "persistent database is not configured".to_string(),
            )),
        }
    }

    /// Ingest every PDF directly inside `dir`.
    pub async fn ingest_directory(
        &self,
        dir: &Path,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        observer.status("Processing PDFs...");
        let outcome = async {
            let collection = self.collection().await?;
            self.pipeline.ingest_directory(&collection, dir, observer, cancel).await
        }
        .await;

        match outcome {
            Ok(report) => {
                observer.status("Processing completed successfully!");
                Ok(report)
            }
            Err(e) => {
                error!(dir = %dir.display(), error = %e, "directory ingestion failed");
                observer.status(&failure_message("Error processing PDFs", &e));
                Err(e)
            }
        }
    }

    /// Ingest one PDF, keying its chunks by the path as given.
    pub async fn add_document(
        &self,
        path: &Path,
        observer: &dyn ProgressObserver,
        cancel: &CancellationToken,
    ) -> Result<DocumentReport> {
        let name = file_name(path);
        let outcome = async {
            let collection = self.collection().await?;
            observer.status(&format!("Processing {name}..."));
            self.pipeline.ingest_file(&collection, path, None, cancel).await
        }
        .await;

        match outcome {
            Ok(report) => {
                observer.status(&format!("{name} added to the database successfully!"));
                Ok(report)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "adding document failed");
                observer.status(&failure_message("Error adding PDF", &e));
                Err(e)
            }
        }
    }

    /// The `top_k` chunks nearest to `query` (configured default when `None`).
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<SearchResult>> {
        let top_k = top_k.unwrap_or(self.pipeline.config().top_k);
        let outcome = async {
            if top_k == 0 {
                return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
            }
            let collection = self.collection().await?;
            self.pipeline.retrieve(&collection, query, top_k).await
        }
        .await;

        if let Err(e) = &outcome {
            error!(error = %e, "retrieval failed");
            observer.status(&failure_message("Error searching documents", e));
        }
        outcome
    }

    /// Retrieve context for `query` and synthesize a grounded answer.
    ///
    /// On success the answer is also delivered as [`StatusEvent::Answer`].
    pub async fn answer(&self, query: &str, observer: &dyn ProgressObserver) -> Result<Answer> {
        observer.status("Searching for an answer...");
        let outcome = async {
            let collection = self.collection().await?;
            let results =
                self.pipeline.retrieve(&collection, query, self.pipeline.config().top_k).await?;
            self.synthesizer.synthesize(query, &results).await
        }
        .await;

        match outcome {
            Ok(answer) => {
                observer.status("Answer generated successfully!");
                observer.notify(StatusEvent::Answer {
                    query: query.to_string(),
                    text: answer.text.clone(),
                });
                Ok(answer)
            }
            Err(e) => {
                error!(error = %e, "answer generation failed");
                observer.status(&failure_message("Error generating answer", &e));
                Err(e)
            }
        }
    }
}

fn failure_message(prefix: &str, error: &RagError) -> String {
    match error {
        RagError::Cancelled => format!("{prefix}: cancelled"),
        other => format!("{prefix}: {other}"),
    }
}
