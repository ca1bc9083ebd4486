use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Letter, whitespace, then a spacing diacritic (e.g. `"B ¨UNZ"`).
static SPACE_BEFORE_DIACRITIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z])\s+([\u{a8}\u{b4}`~\u{2dc}\u{2c7}\^])").unwrap());

/// Spacing diacritic followed by the letter it decorates (e.g. `"R´enyi"`).
static DIACRITIC_BEFORE_LETTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{a8}\u{b4}`~\u{2dc}\u{2c7}\^]\s*([A-Za-z])").unwrap());

static NON_ALNUM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

static AUTHOR_SEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[,;]\s*(?:and\s+)?|\s+(?:and|&)\s+").unwrap());

/// Drop detached accent glyphs so `"B ¨UNZ"` and `"BÜNZ"` fold to the same text.
///
/// The accent itself carries no information once the text is ASCII-folded,
/// so only the letter is kept.
fn strip_separated_diacritics(text: &str) -> String {
    let text = SPACE_BEFORE_DIACRITIC_RE.replace_all(text, "$1$2");
    DIACRITIC_BEFORE_LETTER_RE
        .replace_all(&text, "$1")
        .into_owned()
}

fn unescape_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Normalize a title for fuzzy comparison.
///
/// Produces lowercase ASCII words separated by single spaces:
/// 1. Unescape common HTML entities
/// 2. Remove detached diacritics from PDF extraction
/// 3. NFKD-decompose (also splits ligatures like `ﬁ`) and keep ASCII
/// 4. Lowercase, turn every non-alphanumeric run into a space
pub fn normalize_for_matching(title: &str) -> String {
    let title = unescape_entities(title);
    let title = strip_separated_diacritics(&title);
    let folded: String = title.nfkd().filter(|c| c.is_ascii()).collect();
    let lowered = folded.to_lowercase();
    NON_ALNUM_RE
        .replace_all(&lowered, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a printed author list (`"A, B and C"`) into names.
pub fn split_authors(authors: &str) -> Vec<String> {
    AUTHOR_SEP_RE
        .split(authors.trim())
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of [`split_authors`] for table output.
pub fn join_authors(authors: &[String]) -> String {
    authors.join(", ")
}
