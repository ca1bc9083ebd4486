use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod index;
pub mod linkage;
pub mod matching;
pub mod text_utils;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend, TitleSource};
pub use index::{ClaimSet, RecordId, RecordIndex};
pub use linkage::{
    Ambiguity, LinkEvent, LinkageReport, LinkageStats, Linker, PdfOutcome, PdfOutcomeKind,
};
pub use matching::{MatchDecision, Matcher, MatcherConfig, ScoreBreakdown, ScorePolicy, Scorer};
pub use text_utils::{join_authors, normalize_for_matching, split_authors};

/// Default minimum combined score for a match to be accepted.
pub const DEFAULT_THRESHOLD: u8 = 60;

/// One article entry from the journal's table of contents.
///
/// Records are produced by the TOC extraction step and are only ever
/// mutated by the linkage orchestrator, which fills in
/// `matched_filename` / `match_confidence` when a PDF claims the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographicRecord {
    pub volume: u32,
    pub issue: u32,
    /// Only populated on the first row of a year group in the source table.
    pub year: Option<u32>,
    pub title: String,
    pub authors: Vec<String>,
    /// Page range as printed in the TOC, e.g. `"12-20"`.
    pub pages: String,
    pub matched_filename: Option<String>,
    pub match_confidence: Option<u8>,
}

impl BibliographicRecord {
    pub fn new(volume: u32, issue: u32, year: Option<u32>, title: impl Into<String>) -> Self {
        Self {
            volume,
            issue,
            year,
            title: title.into(),
            authors: Vec::new(),
            pages: String::new(),
            matched_filename: None,
            match_confidence: None,
        }
    }

    pub fn with_authors(mut self, authors: Vec<String>) -> Self {
        self.authors = authors;
        self
    }

    pub fn with_pages(mut self, pages: impl Into<String>) -> Self {
        self.pages = pages.into();
        self
    }

    pub fn is_claimed(&self) -> bool {
        self.matched_filename.is_some()
    }
}

/// Text of the first few pages of one PDF file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    pub filename: String,
    pub pages: Vec<String>,
}

impl PdfDocument {
    pub fn new(filename: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            filename: filename.into(),
            pages,
        }
    }

    /// True when no page produced any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.trim().is_empty())
    }
}

/// A PDF that could not be turned into a [`PdfDocument`].
#[derive(Error, Debug)]
#[error("{filename}: {source}")]
pub struct DocumentError {
    pub filename: String,
    #[source]
    pub source: BackendError,
}

/// Title recovered from a PDF's first pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTitle {
    pub source_filename: String,
    pub text: String,
}

/// Why no usable title came out of a PDF.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    #[error("unreadable PDF: {reason}")]
    Unreadable { reason: String },
    #[error("no text on the scanned pages")]
    EmptyText,
    #[error("title candidate too short: {candidate:?}")]
    TitleTooShort { candidate: String },
}

impl ExtractionError {
    /// Short machine-friendly label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionError::Unreadable { .. } => "unreadable",
            ExtractionError::EmptyText => "empty_text",
            ExtractionError::TitleTooShort { .. } => "title_too_short",
        }
    }
}

/// One accepted PDF → record association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    pub record: RecordId,
    pub filename: String,
    pub score: u8,
    pub scorer: Scorer,
    pub breakdown: ScoreBreakdown,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
