//! Retrieval-augmented question answering over a collection of PDFs.
//!
//! Ingestion reads each PDF page by page, splits the text into word-bounded
//! chunks, embeds every chunk and upserts it into a vector index under a
//! content-derived id. Answering embeds the question, retrieves the nearest
//! chunks and asks a language model to answer strictly from them.
//!
//! The embedding model, the language model and the vector index are
//! capabilities behind traits ([`EmbeddingProvider`], [`CompletionProvider`],
//! [`VectorStore`]); [`RagSession`] ties them to one active collection and
//! [`TaskRunner`] runs the long operations in the background.

pub mod chunking;
pub mod completion;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod inmemory;
pub mod local;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod progress;
pub mod retry;
pub mod session;
pub mod synthesizer;
pub mod tasks;
pub mod vectorstore;

pub use chunking::{Chunker, WordChunker, split_words};
pub use completion::{CompletionProvider, CompletionRequest};
pub use config::{DEFAULT_COLLECTION, PromptConfig, RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, SearchResult, chunk_id};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{
    ExtractedText, PageError, PageSource, PdfExtractor, PdfPages, TextExtractor, extract_pages,
    normalize_page_text,
};
pub use inmemory::InMemoryVectorStore;
pub use local::LocalVectorStore;
#[cfg(feature = "openai")]
pub use openai::{OpenAICompletionProvider, OpenAIEmbeddingProvider};
pub use pipeline::{DocumentReport, IngestReport, RagPipeline, RagPipelineBuilder, discover_pdfs};
pub use progress::{ChannelObserver, NoopObserver, ProgressObserver, RecordingObserver, StatusEvent};
pub use retry::{RetryPolicy, RetryingCompletion, RetryingEmbedder};
pub use session::RagSession;
pub use synthesizer::{Answer, AnswerSynthesizer};
pub use tasks::{Task, TaskHandle, TaskOutput, TaskRunner};
pub use vectorstore::{Collection, VectorStore};

pub use tokio_util::sync::CancellationToken;
