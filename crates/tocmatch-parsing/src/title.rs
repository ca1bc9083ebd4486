use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::text_processing::{collapse_whitespace, fix_hyphenation};

/// Footnote symbols glued to the title (`Title*`, `Title†`).
static FOOTNOTE_SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*†‡§¶]+").unwrap());

/// Short bracketed footnote references: `[1]`, `[a]`, `[*]`.
static BRACKET_MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\[[^\]]{0,5}\]").unwrap());

/// A colon followed by nothing but digits/punctuation: `"Title: 1"`, `"Title:"`.
static DANGLING_COLON_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r":[^\p{L}:]*$").unwrap());

static TRAILING_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s,;:\-–—]+$").unwrap());

static LEADING_PUNCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\s,;:\-–—]+").unwrap());

/// Join title lines into a single clean line.
///
/// Lines are joined with newlines first so that line-wrap hyphenation can
/// be told apart from real hyphens.
pub fn clean_title(lines: &[&str], compound_suffixes: &HashSet<String>) -> String {
    let joined = lines.join("\n");
    let text = fix_hyphenation(&joined, compound_suffixes);
    let text = BRACKET_MARKER_RE.replace_all(&text, "");
    let text = FOOTNOTE_SYMBOL_RE.replace_all(&text, "");
    let text = collapse_whitespace(&text);
    let text = DANGLING_COLON_RE.replace(&text, "");
    let text = TRAILING_PUNCT_RE.replace(&text, "");
    LEADING_PUNCT_RE.replace(&text, "").into_owned()
}
