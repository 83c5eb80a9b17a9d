//! Grounded answer synthesis.
//!
//! The synthesizer turns retrieved chunks into a single completion request
//! whose system instruction restricts the model to the supplied context. When
//! there is no context, or the model says the context is insufficient, the
//! answer is exactly the configured "not available" sentinel.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::completion::{CompletionProvider, CompletionRequest};
use crate::config::{PromptConfig, RagConfig};
use crate::document::SearchResult;
use crate::error::Result;

/// A synthesized answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// Text shown to the user.
    pub text: String,
    /// True when `text` is the "not available" sentinel.
    pub not_available: bool,
    /// Number of retrieved chunks the answer was grounded on.
    pub context_chunks: usize,
}

/// Builds grounded prompts and calls a [`CompletionProvider`].
pub struct AnswerSynthesizer {
    completion: Arc<dyn CompletionProvider>,
    prompt: PromptConfig,
    temperature: f32,
    max_tokens: u32,
}

impl AnswerSynthesizer {
    /// Create a synthesizer with the prompt and sampling settings from `config`.
    pub fn new(completion: Arc<dyn CompletionProvider>, config: &RagConfig) -> Self {
        Self {
            completion,
            prompt: config.prompt.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// The sentinel answer for questions the context cannot answer.
    pub fn not_available(&self) -> &str {
        &self.prompt.not_available
    }

    /// The fixed system instruction.
    pub fn system_instruction(&self) -> String {
        let PromptConfig { domain, answer_language, not_available } = &self.prompt;
        format!(
            "You are an assistant specialized in {domain}. Write explanatory answers for the \
             user using only the information in the context chunks provided. You may rephrase \
             the chunks, but never stray from their original meaning and never add information \
             the context does not support. If the question cannot be answered from the chunks, \
             reply exactly: '{not_available}'. Whenever the content or the question is in \
             another language, translate it to {answer_language} before answering, and always \
             answer in {answer_language}."
        )
    }

    /// Build the completion request for `query` over `results`.
    ///
    /// Chunk texts are joined with newlines in retrieval order.
    pub fn build_request(&self, query: &str, results: &[SearchResult]) -> CompletionRequest {
        let context =
            results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n");
        CompletionRequest {
            system: self.system_instruction(),
            user: format!("Context: {context}\n\nQuestion: {query}"),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Answer `query` from `results`.
    ///
    /// With no results the model is not called and the sentinel is returned.
    pub async fn synthesize(&self, query: &str, results: &[SearchResult]) -> Result<Answer> {
        if results.is_empty() {
            debug!("no context retrieved, answering with sentinel");
            return Ok(self.sentinel_answer(0));
        }

        let request = self.build_request(query, results);
        let reply = self.completion.complete(&request).await?;
        let reply = reply.trim();

        let answer = if reply.is_empty() || reply.contains(self.sentinel_phrase()) {
            self.sentinel_answer(results.len())
        } else {
            Answer { text: reply.to_string(), not_available: false, context_chunks: results.len() }
        };

        info!(
            provider = self.completion.name(),
            context_chunks = answer.context_chunks,
            not_available = answer.not_available,
            "answer synthesized"
        );
        Ok(answer)
    }

    /// The sentinel without surrounding whitespace or trailing punctuation, so
    /// a reply matches whether or not the model ends it with a period.
    fn sentinel_phrase(&self) -> &str {
        let trimmed = self.prompt.not_available.trim();
        let phrase =
            trimmed.trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        if phrase.is_empty() { trimmed } else { phrase }
    }

    fn sentinel_answer(&self, context_chunks: usize) -> Answer {
        Answer { text: self.prompt.not_available.clone(), not_available: true, context_chunks }
    }
}
