//! Text extraction from PDF documents.
//!
//! Extraction works page by page. A page that cannot be decoded contributes
//! no text and is recorded in [`ExtractedText::failed_pages`]; the remaining
//! pages are still read. Only failing to open the document at all is an
//! error.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{RagError, Result};

/// Failure to read a single page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("page {page}: {message}")]
pub struct PageError {
    /// One-based page number.
    pub page: u32,
    /// What went wrong.
    pub message: String,
}

/// A document whose pages can be read independently.
pub trait PageSource {
    /// One-based page numbers in reading order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Raw text of one page.
    fn page_text(&self, page: u32) -> std::result::Result<String, PageError>;
}

/// The concatenated text of a document plus the pages that could not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedText {
    /// Normalized text of every readable page, one page per line group.
    pub text: String,
    /// Total number of pages in the document.
    pub pages: usize,
    /// Pages that were skipped.
    pub failed_pages: Vec<PageError>,
}

/// Turns a file on disk into [`ExtractedText`].
pub trait TextExtractor: Send + Sync {
    /// Read `path` and extract its text.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ExtractionError`] only when the document itself cannot
    /// be opened; unreadable pages are reported inside the result.
    fn extract(&self, path: &Path) -> Result<ExtractedText>;
}

/// [`TextExtractor`] for PDF files, backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<ExtractedText> {
        let pdf = PdfPages::load(path)?;
        Ok(extract_pages(&pdf, path))
    }
}

/// A loaded PDF exposed as a [`PageSource`].
pub struct PdfPages {
    path: PathBuf,
    document: lopdf::Document,
}

impl PdfPages {
    /// Parse the PDF at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let document = lopdf::Document::load(path).map_err(|e| RagError::ExtractionError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self { path: path.to_path_buf(), document })
    }
}

impl PageSource for PdfPages {
    fn page_numbers(&self) -> Vec<u32> {
        self.document.get_pages().keys().copied().collect()
    }

    fn page_text(&self, page: u32) -> std::result::Result<String, PageError> {
        // lopdf can panic on malformed content streams.
        let outcome = catch_unwind(AssertUnwindSafe(|| self.document.extract_text(&[page])));
        match outcome {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(PageError { page, message: e.to_string() }),
            Err(_) => Err(PageError {
                page,
                message: format!("text decoder panicked reading {}", self.path.display()),
            }),
        }
    }
}

/// Read every page of `source`, skipping the ones that fail.
///
/// `path` is only used for log context.
pub fn extract_pages(source: &dyn PageSource, path: &Path) -> ExtractedText {
    let pages = source.page_numbers();
    let mut extracted = ExtractedText { pages: pages.len(), ..ExtractedText::default() };

    for page in pages {
        match source.page_text(page) {
            Ok(raw) => {
                let text = normalize_page_text(&raw);
                if text.trim().is_empty() {
                    continue;
                }
                if !extracted.text.is_empty() {
                    extracted.text.push('\n');
                }
                extracted.text.push_str(&text);
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    page = e.page,
                    error = %e.message,
                    "skipping unreadable page"
                );
                extracted.failed_pages.push(e);
            }
        }
    }

    debug!(
        path = %path.display(),
        pages = extracted.pages,
        failed = extracted.failed_pages.len(),
        chars = extracted.text.len(),
        "extracted text"
    );
    extracted
}

/// Drop characters that do not survive a round trip through UTF-8 text
/// storage: U+FFFD replacement characters and control characters other than
/// newline, carriage return and tab.
pub fn normalize_page_text(raw: &str) -> String {
    raw.chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .filter(|&c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}
