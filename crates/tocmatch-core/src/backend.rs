use std::path::Path;

use thiserror::Error;

use crate::{ExtractedTitle, ExtractionError, PdfDocument};

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("failed to open PDF: {0}")]
    OpenError(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("failed to extract text: {0}")]
    ExtractionError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for PDF text extraction backends.
///
/// Implementors provide the low-level text step only; everything that
/// interprets the text (boilerplate skipping, title assembly) lives in
/// `tocmatch_parsing::TitleExtractor`.
pub trait PdfBackend: Send + Sync {
    /// Extract the text of at most `max_pages` leading pages, one string per page.
    ///
    /// The document must be closed again before this returns, on success
    /// and on error alike.
    fn extract_pages(&self, path: &Path, max_pages: usize) -> Result<Vec<String>, BackendError>;
}

/// Turns a loaded document into a title candidate.
///
/// The linkage orchestrator only sees this seam, so the extraction
/// heuristics can evolve (or be replaced in tests) without touching the
/// matching side.
pub trait TitleSource {
    fn extract_title(&self, document: &PdfDocument) -> Result<ExtractedTitle, ExtractionError>;
}

impl<F> TitleSource for F
where
    F: Fn(&PdfDocument) -> Result<ExtractedTitle, ExtractionError>,
{
    fn extract_title(&self, document: &PdfDocument) -> Result<ExtractedTitle, ExtractionError> {
        self(document)
    }
}
