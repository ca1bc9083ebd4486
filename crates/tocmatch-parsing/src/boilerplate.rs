//! Recognizers for lines that are never part of an article title.
//!
//! Journal PDFs open with running headers, copyright notices and page
//! numbers before the title. Each pattern carries the category it reports
//! under so extraction traces can say *why* a line was skipped.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BoilerplateKind {
    Copyright,
    RunningHeader,
    PageNumber,
    /// User-defined category from the config file.
    Other(String),
}

impl BoilerplateKind {
    /// Parse a category name as written in the config file.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "copyright" => BoilerplateKind::Copyright,
            "running_header" | "header" => BoilerplateKind::RunningHeader,
            "page_number" => BoilerplateKind::PageNumber,
            _ => BoilerplateKind::Other(name.trim().to_string()),
        }
    }
}

impl fmt::Display for BoilerplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoilerplateKind::Copyright => f.write_str("copyright"),
            BoilerplateKind::RunningHeader => f.write_str("running_header"),
            BoilerplateKind::PageNumber => f.write_str("page_number"),
            BoilerplateKind::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoilerplatePattern {
    pub kind: BoilerplateKind,
    pub regex: Regex,
}

impl BoilerplatePattern {
    pub fn new(kind: BoilerplateKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
        })
    }
}

pub(crate) static DEFAULT_BOILERPLATE: Lazy<Vec<BoilerplatePattern>> = Lazy::new(|| {
    use BoilerplateKind::*;
    [
        (Copyright, r"(?i)copyright"),
        (Copyright, r"©"),
        (Copyright, r"(?i)all rights reserved"),
        (Copyright, r"(?i)^\(c\)\s*\d{4}"),
        (RunningHeader, r"(?i)\bjournal\b"),
        (RunningHeader, r"(?i)\bvol(?:\.|ume)?\s*\d+"),
        (RunningHeader, r"(?i)\bno\.\s*\d+"),
        (RunningHeader, r"(?i)\bissn\b"),
        (RunningHeader, r"(?i)(?:www\.|https?://)"),
        (RunningHeader, r"(?i)^doi\s*:"),
        (RunningHeader, r"(?i)\bpp?\.\s*\d+\s*[-–]\s*\d+"),
        (PageNumber, r"(?i)^(?:page\s*)?\d{1,4}$"),
        (PageNumber, r"(?i)^page\s+\d+\s+of\s+\d+$"),
        (PageNumber, r"^[-–]\s*\d{1,4}\s*[-–]$"),
    ]
    .into_iter()
    .map(|(kind, pattern)| BoilerplatePattern {
        kind,
        regex: Regex::new(pattern).unwrap(),
    })
    .collect()
});

/// The category of the first pattern matching `line`, if any.
pub fn classify<'a>(line: &str, patterns: &'a [BoilerplatePattern]) -> Option<&'a BoilerplateKind> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    patterns
        .iter()
        .find(|p| p.regex.is_match(line))
        .map(|p| &p.kind)
}
