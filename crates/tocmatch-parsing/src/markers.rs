use once_cell::sync::Lazy;
use regex::Regex;

/// Article-type labels printed above the title.
pub(crate) const DEFAULT_SECTION_MARKERS: &[&str] = &[
    "EDITORIAL",
    "ORIGINAL ARTICLE",
    "SPECIAL ISSUE",
    "REVIEW ARTICLE",
    "RESEARCH ARTICLE",
    "REVIEW",
    "TREND",
    "TRENDS",
    "SHORT COMMUNICATION",
    "TECHNICAL NOTE",
    "CASE STUDY",
    "INVITED PAPER",
    "LETTER",
];

/// Front-matter labels that end the title block. A title never starts with
/// one of these.
pub(crate) static DEFAULT_STOP_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(?:abstract|keywords?|key\s+words|index\s+terms)\b",
        r"(?i)^(?:\d\.?\s+)?introduction\b",
        r"(?i)^(?:received|revised|accepted|published online|available online)\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Canonical form used for marker comparison: uppercase, single spaces,
/// trailing punctuation removed.
pub(crate) fn marker_key(line: &str) -> String {
    line.trim()
        .trim_end_matches(|c: char| c == ':' || c == '.' || c == '-' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
