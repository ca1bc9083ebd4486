//! Title extraction from the text of a journal article's first pages.

pub mod authors;
pub mod boilerplate;
pub mod config;
pub mod extractor;
mod markers;
pub mod text_processing;
pub mod title;

pub use boilerplate::{BoilerplateKind, BoilerplatePattern};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, ListOverride};
pub use extractor::{StopReason, TitleExtractor, TitleTrace};
// Re-export domain types from core (canonical definitions live there)
pub use tocmatch_core::{ExtractedTitle, ExtractionError};

/// Extract a title from page texts with the default configuration.
pub fn extract_title(pages: &[String]) -> Result<String, ExtractionError> {
    TitleExtractor::new().extract_title_from_pages(pages)
}
