use std::path::Path;

use mupdf::{Document, TextPageFlags};

use tocmatch_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency
/// (which is AGPL-3.0) so that the rest of the workspace does not
/// transitively depend on it.
///
/// Text blocks are separated by an empty line, so the title block, the
/// byline and the affiliation block come out as separate paragraphs.
/// Header/footer bands are kept by default because running headers are
/// recognized textually during title extraction.
#[derive(Debug, Clone, Default)]
pub struct MupdfBackend {
    /// Fraction of page height from bottom to exclude as footer (0.0–1.0).
    footer_exclusion_ratio: Option<f32>,
    /// Fraction of page height from top to exclude as header (0.0–1.0).
    header_exclusion_ratio: Option<f32>,
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the footer exclusion ratio. Pass `0.0` to disable.
    pub fn with_footer_exclusion(mut self, ratio: f32) -> Self {
        self.footer_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }

    /// Set the header exclusion ratio. Pass `0.0` to disable.
    pub fn with_header_exclusion(mut self, ratio: f32) -> Self {
        self.header_exclusion_ratio = if ratio > 0.0 { Some(ratio) } else { None };
        self
    }
}

fn extraction_error(e: mupdf::Error) -> BackendError {
    BackendError::ExtractionError(e.to_string())
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path, max_pages: usize) -> Result<Vec<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        // Dropped at the end of this call on every path, which closes the file.
        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        if document.needs_password().map_err(extraction_error)? {
            return Err(BackendError::Encrypted);
        }

        let mut pages_text = Vec::new();

        for page_result in document.pages().map_err(extraction_error)?.take(max_pages) {
            let page = page_result.map_err(extraction_error)?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(extraction_error)?;

            let page_bounds = page.bounds().map_err(extraction_error)?;
            let page_height = page_bounds.y1 - page_bounds.y0;

            let header_threshold = self
                .header_exclusion_ratio
                .map(|r| page_bounds.y0 + page_height * r);
            let footer_threshold = self
                .footer_exclusion_ratio
                .map(|r| page_bounds.y1 - page_height * r);

            let mut page_text = String::new();
            for block in text_page.blocks() {
                let block_bounds = block.bounds();

                if header_threshold.is_some_and(|t| block_bounds.y1 <= t) {
                    continue;
                }
                if footer_threshold.is_some_and(|t| block_bounds.y0 >= t) {
                    continue;
                }

                for line in block.lines() {
                    let line_text: String = line
                        .chars()
                        .map(|c| c.char().unwrap_or('\u{FFFD}'))
                        .collect();
                    page_text.push_str(&line_text);
                    page_text.push('\n');
                }
                page_text.push('\n');
            }
            pages_text.push(page_text);
        }

        tracing::trace!(path = %path.display(), pages = pages_text.len(), "read PDF text");
        Ok(pages_text)
    }
}
