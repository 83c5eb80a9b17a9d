//! Deterministic test doubles shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pdfrag::{
    AnswerSynthesizer, CompletionProvider, CompletionRequest, EmbeddingProvider, ExtractedText,
    PageError, PageSource, RagConfig, RagError, RagPipeline, RagSession, TextExtractor,
    extract_pages,
};

pub const DIM: usize = 64;

/// Bag-of-words embedding: each lowercase word bumps one hashed dimension.
///
/// Texts sharing words end up close under cosine similarity.
#[derive(Default)]
pub struct BagOfWordsEmbedder {
    pub calls: AtomicUsize,
}

impl BagOfWordsEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn bucket(word: &str) -> usize {
    let hash = word.bytes().fold(0xcbf2_9ce4_8422_2325u64, |acc, b| {
        (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    });
    (hash % DIM as u64) as usize
}

#[async_trait]
impl EmbeddingProvider for BagOfWordsEmbedder {
    async fn embed(&self, text: &str) -> pdfrag::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut v = vec![0.0f32; DIM];
        for word in text.split_whitespace() {
            let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if !word.is_empty() {
                v[bucket(&word)] += 1.0;
            }
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// Treats any file as UTF-8 text whose pages are separated by form feeds.
/// A page containing `<<corrupt>>` fails to decode.
pub struct PlainTextExtractor;

struct TextPages(Vec<String>);

impl PageSource for TextPages {
    fn page_numbers(&self) -> Vec<u32> {
        (1..=self.0.len() as u32).collect()
    }

    fn page_text(&self, page: u32) -> Result<String, PageError> {
        let text = &self.0[page as usize - 1];
        if text.contains("<<corrupt>>") {
            return Err(PageError { page, message: "malformed content stream".into() });
        }
        Ok(text.clone())
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> pdfrag::Result<ExtractedText> {
        let raw = std::fs::read_to_string(path).map_err(|e| RagError::ExtractionError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let pages = TextPages(raw.split('\u{c}').map(str::to_string).collect());
        Ok(extract_pages(&pages, path))
    }
}

/// Echoes the context back, or the sentinel when the question's key word is
/// missing from it. Mimics a model that follows the grounding instruction.
pub struct GroundedEcho {
    pub sentinel: String,
    pub requests: std::sync::Mutex<Vec<CompletionRequest>>,
}

impl GroundedEcho {
    pub fn new(config: &RagConfig) -> Self {
        Self { sentinel: config.prompt.not_available.clone(), requests: Default::default() }
    }
}

#[async_trait]
impl CompletionProvider for GroundedEcho {
    async fn complete(&self, request: &CompletionRequest) -> pdfrag::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let (context, question) = request
            .user
            .strip_prefix("Context: ")
            .and_then(|rest| rest.split_once("\n\nQuestion: "))
            .expect("user turn has context and question");
        let key = question
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
            .max_by_key(|w| w.len())
            .unwrap_or_default();
        if context.to_lowercase().contains(&key) {
            Ok(format!("From the documents: {}", context.lines().next().unwrap_or_default()))
        } else {
            Ok(self.sentinel.clone())
        }
    }

    fn name(&self) -> &str {
        "grounded-echo"
    }
}

pub fn pipeline(config: RagConfig, embedder: Arc<BagOfWordsEmbedder>) -> Arc<RagPipeline> {
    Arc::new(
        RagPipeline::builder()
            .config(config)
            .embedding_provider(embedder)
            .extractor(Arc::new(PlainTextExtractor))
            .build()
            .unwrap(),
    )
}

pub fn session(config: RagConfig) -> (Arc<RagSession>, Arc<BagOfWordsEmbedder>, Arc<GroundedEcho>) {
    let embedder = Arc::new(BagOfWordsEmbedder::default());
    let completion = Arc::new(GroundedEcho::new(&config));
    let synthesizer = Arc::new(AnswerSynthesizer::new(completion.clone(), &config));
    let session = Arc::new(RagSession::new(pipeline(config, embedder.clone()), synthesizer));
    (session, embedder, completion)
}
