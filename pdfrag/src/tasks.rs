//! Background execution of ingestion and answer tasks.
//!
//! [`TaskRunner::submit`] spawns the work on the `tokio` runtime and returns
//! immediately. Progress and status flow through the runner's
//! [`ProgressObserver`]; the final value is available from
//! [`TaskHandle::wait`]. Cancellation is cooperative: ingestion notices it
//! between chunks and documents, answering notices it before the turn starts.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info_span};

use crate::error::{RagError, Result};
use crate::pipeline::{DocumentReport, IngestReport};
use crate::progress::ProgressObserver;
use crate::session::RagSession;
use crate::synthesizer::Answer;

/// Work a driver can hand to the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Ingest every PDF in a directory.
    IngestDirectory(PathBuf),
    /// Ingest one PDF.
    AddDocument(PathBuf),
    /// Answer a question.
    Answer(String),
}

impl Task {
    fn kind(&self) -> &'static str {
        match self {
            Task::IngestDirectory(_) => "ingest_directory",
            Task::AddDocument(_) => "add_document",
            Task::Answer(_) => "answer",
        }
    }

    fn failure_prefix(&self) -> &'static str {
        match self {
            Task::IngestDirectory(_) => "Error processing PDFs",
            Task::AddDocument(_) => "Error adding PDF",
            Task::Answer(_) => "Error generating answer",
        }
    }
}

/// What a finished task produced.
#[derive(Debug, Clone)]
pub enum TaskOutput {
    /// Result of [`Task::IngestDirectory`].
    Ingested(IngestReport),
    /// Result of [`Task::AddDocument`].
    Added(DocumentReport),
    /// Result of [`Task::Answer`].
    Answered(Answer),
}

/// A submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    cancel: CancellationToken,
    join: JoinHandle<Result<TaskOutput>>,
}

impl TaskHandle {
    /// Runner-assigned id, unique per runner.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Ask the task to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this task when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the task has finished.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the task to finish.
    pub async fn wait(self) -> Result<TaskOutput> {
        let id = self.id;
        self.join.await.map_err(|e| RagError::PipelineError(format!("task {id} failed: {e}")))?
    }
}

/// Spawns session operations off the caller's control flow.
pub struct TaskRunner {
    session: Arc<RagSession>,
    observer: Arc<dyn ProgressObserver>,
    shutdown: CancellationToken,
    next_id: AtomicU64,
}

impl TaskRunner {
    /// Create a runner reporting to `observer`.
    pub fn new(session: Arc<RagSession>, observer: Arc<dyn ProgressObserver>) -> Self {
        Self { session, observer, shutdown: CancellationToken::new(), next_id: AtomicU64::new(1) }
    }

    /// The session tasks run against.
    pub fn session(&self) -> &Arc<RagSession> {
        &self.session
    }

    /// Spawn `task` and return its handle without waiting.
    ///
    /// Must be called from within a `tokio` runtime.
    pub fn submit(&self, task: Task) -> TaskHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = self.shutdown.child_token();
        let session = Arc::clone(&self.session);
        let observer = Arc::clone(&self.observer);
        let token = cancel.clone();
        let span = info_span!("task", id, kind = task.kind());

        debug!(id, kind = task.kind(), "submitting task");
        let join = tokio::spawn(async move {
            let prefix = task.failure_prefix();
            let worker_observer = Arc::clone(&observer);
            let work = tokio::spawn(
                async move { run(&session, task, worker_observer.as_ref(), &token).await }
                    .instrument(span),
            );
            match work.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(id, error = %e, "task aborted");
                    observer.status(&format!("{prefix}: task aborted: {e}"));
                    Err(RagError::PipelineError(format!("task {id} aborted: {e}")))
                }
            }
        });

        TaskHandle { id, cancel, join }
    }

    /// Cancel every task submitted so far.
    pub fn cancel_all(&self) {
        self.shutdown.cancel();
    }
}

async fn run(
    session: &RagSession,
    task: Task,
    observer: &dyn ProgressObserver,
    cancel: &CancellationToken,
) -> Result<TaskOutput> {
    match task {
        Task::IngestDirectory(dir) => {
            session.ingest_directory(&dir, observer, cancel).await.map(TaskOutput::Ingested)
        }
        Task::AddDocument(path) => {
            session.add_document(&path, observer, cancel).await.map(TaskOutput::Added)
        }
        Task::Answer(query) => {
            if cancel.is_cancelled() {
                observer.status("Error generating answer: cancelled");
                return Err(RagError::Cancelled);
            }
            session.answer(&query, observer).await.map(TaskOutput::Answered)
        }
    }
}
