//! Error types for the `pdfrag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A document could not be opened or parsed at all.
    ///
    /// Individual unreadable pages never produce this error; they are
    /// skipped and recorded in [`ExtractedText`](crate::ExtractedText).
    #[error("Extraction error ({}): {message}", path.display())]
    ExtractionError {
        /// The document that failed.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether repeating the same request may succeed.
        retryable: bool,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    VectorStoreError {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while requesting a completion from a language model.
    #[error("Completion error ({provider}): {message}")]
    CompletionError {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether repeating the same request may succeed.
        retryable: bool,
    },

    /// An operation needed an index but the session has none yet.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An error in the pipeline orchestration.
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// The operation observed a cancellation request and stopped.
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error from the local filesystem.
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// A persisted index file could not be encoded or decoded.
    #[error(transparent)]
    SerializationError(#[from] serde_json::Error),
}

impl RagError {
    /// Whether a collaborator call that failed with this error is worth retrying.
    ///
    /// Only embedding and completion errors flagged as transient (rate limits,
    /// server errors, connection failures) qualify.
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::EmbeddingError { retryable, .. }
            | RagError::CompletionError { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
