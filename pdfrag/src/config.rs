//! Configuration for the RAG pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::retry::RetryPolicy;

/// Name of the collection that holds the document corpus.
pub const DEFAULT_COLLECTION: &str = "document_chunks";

/// Default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Default chat completion model.
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o-mini";

/// Configuration parameters for the RAG pipeline.
///
/// Every field has a default, so a JSON config file only needs the keys it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in whitespace-separated words.
    pub chunk_size: usize,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Name of the collection documents are ingested into and queried from.
    pub collection: String,
    /// Embedding model name passed to the embedding provider.
    pub embedding_model: String,
    /// Chat model name passed to the completion provider.
    pub completion_model: String,
    /// Sampling temperature for answer generation.
    pub temperature: f32,
    /// Upper bound on generated answer tokens.
    pub max_tokens: u32,
    /// Prompt wording for the answer synthesizer.
    pub prompt: PromptConfig,
    /// Backoff policy for embedding and completion calls.
    pub retry: RetryPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            top_k: 5,
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            temperature: 0.5,
            max_tokens: 150,
            prompt: PromptConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Load a configuration from a JSON file and validate it.
    ///
    /// Missing keys fall back to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: RagConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `chunk_size == 0`
    /// - `top_k == 0`
    /// - `temperature` is outside `0.0..=2.0`
    /// - `max_tokens == 0`
    /// - `collection` is empty or contains characters other than `[A-Za-z0-9_-]`
    /// - the prompt sentinel is empty
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::ConfigError("chunk_size must be greater than zero".to_string()));
        }
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::ConfigError(format!(
                "temperature ({}) must be between 0.0 and 2.0",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(RagError::ConfigError("max_tokens must be greater than zero".to_string()));
        }
        validate_collection_name(&self.collection)?;
        if self.prompt.not_available.trim().is_empty() {
            return Err(RagError::ConfigError("prompt.not_available must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Collection names double as file names for the local store.
pub(crate) fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RagError::ConfigError("collection name must not be empty".to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(RagError::ConfigError(format!(
            "collection name '{name}' may only contain ASCII letters, digits, '_' and '-'"
        )));
    }
    Ok(())
}

/// Wording of the grounded-answer system instruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    /// Subject area the assistant presents itself as specialised in.
    pub domain: String,
    /// Language every answer is written in.
    pub answer_language: String,
    /// Exact phrase returned when the context cannot answer the question.
    pub not_available: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            domain: "energy efficiency and related topics".to_string(),
            answer_language: "Brazilian Portuguese".to_string(),
            not_available: "Esta informação não consta nos artigos armazenados".to_string(),
        }
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in words.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the collection name.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.config.collection = name.into();
        self
    }

    /// Set the embedding model name.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the completion model name.
    pub fn completion_model(mut self, model: impl Into<String>) -> Self {
        self.config.completion_model = model.into();
        self
    }

    /// Set the sampling temperature for answers.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the answer length cap in tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the prompt wording.
    pub fn prompt(mut self, prompt: PromptConfig) -> Self {
        self.config.prompt = prompt;
        self
    }

    /// Set the retry policy for collaborator calls.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// See [`RagConfig::validate`] for the rules.
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
