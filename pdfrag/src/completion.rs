//! The language-model completion capability consumed by the answer synthesizer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One single-turn chat completion: a system instruction plus one user message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// Instruction constraining the model's behavior.
    pub system: String,
    /// The user turn.
    pub user: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

/// A language model that turns a [`CompletionRequest`] into text.
///
/// Failures must be reported as
/// [`RagError::CompletionError`](crate::RagError::CompletionError).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate the assistant reply for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Short provider/model label used in logs.
    fn name(&self) -> &str;
}
