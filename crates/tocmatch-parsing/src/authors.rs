//! Author-line detection.
//!
//! Title assembly stops at the byline. A byline is recognized by a small
//! additive score over its shape:
//!
//! | signal | points |
//! |---|---|
//! | two or more name segments, all name-like | +2 |
//! | "Firstname Lastname and Firstname Lastname" | +2 |
//! | affiliation markers (`1`, `*`, `†`) or initials (`J.`) | +1 |
//! | at least 90% of words look like name parts | +1 |
//! | a lowercase word that is not a name particle | −2 |
//!
//! A line scoring [`AUTHOR_LINE_THRESHOLD`] or more is treated as authors.
//! Titles made only of capitalized proper nouns joined by "and" can be
//! misread as bylines; such titles lose their later lines.
//!
//! Affiliation lines (departments, e-mail addresses) follow the byline and
//! end the title block the same way.

use once_cell::sync::Lazy;
use regex::Regex;

pub const AUTHOR_LINE_THRESHOLD: i32 = 2;

static SEGMENT_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|;|&|\band\b)\s*").unwrap());

/// Capitalized word or initial, optionally hyphenated: `Hen-Wei`, `J.`, `O'Neil`, `Y.-J.`
static NAME_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\p{Lu}[\p{L}'’]*\.?(?:-\p{Lu}[\p{L}'’]*\.?)*$").unwrap()
});

static INITIAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\p{Lu}\.(?:-?\p{Lu}\.)*$").unwrap());

/// "Name Name and Name Name", the common two-author byline.
static TWO_AUTHORS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\p{Lu}\S*(?:\s+\p{Lu}\S*)+\s+(?:and|AND)\s+\p{Lu}\S*(?:\s+\p{Lu}\S*)+$").unwrap()
});

/// Trailing affiliation markers on a name: `Huang1`, `Yang*`, `Lee†`.
static AFFILIATION_MARK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\d*†‡§]+$").unwrap());

static AFFILIATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)@|\b(?:university|universit[àéy]|institute|department|dept\.|college|laboratory|faculty|school of|corresponding author)\b",
    )
    .unwrap()
});

const NAME_PARTICLES: &[&str] = &[
    "van", "von", "de", "der", "den", "di", "da", "del", "della", "la", "le", "du", "dos", "bin",
    "al", "ter",
];

fn is_particle(word: &str) -> bool {
    NAME_PARTICLES.contains(&word)
}

/// Score how much `line` looks like an author byline.
pub fn author_line_score(line: &str) -> i32 {
    let line = line.trim();
    if line.is_empty() {
        return i32::MIN;
    }

    let mut score = 0;
    let mut has_marks = false;
    let mut has_initials = false;
    let mut has_lowercase_word = false;
    let mut name_words = 0usize;
    let mut total_words = 0usize;

    let segments: Vec<&str> = SEGMENT_SPLIT_RE
        .split(line)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let mut name_segments = 0usize;
    for segment in &segments {
        let mut tokens = 0usize;
        let mut proper = 0usize;
        let mut all_name_like = true;

        for raw in segment.split_whitespace() {
            let word = AFFILIATION_MARK_RE.replace(raw, "");
            if word.len() != raw.len() {
                has_marks = true;
            }
            if word.is_empty() {
                continue;
            }
            tokens += 1;
            total_words += 1;

            if INITIAL_RE.is_match(&word) {
                has_initials = true;
                name_words += 1;
                proper += 1;
            } else if NAME_TOKEN_RE.is_match(&word) {
                name_words += 1;
                proper += 1;
            } else if is_particle(&word) {
                name_words += 1;
            } else {
                all_name_like = false;
                if word.chars().next().is_some_and(char::is_lowercase) {
                    has_lowercase_word = true;
                }
            }
        }

        if all_name_like && (2..=4).contains(&tokens) && proper >= 2 {
            name_segments += 1;
        }
    }

    if segments.len() >= 2 && name_segments == segments.len() {
        score += 2;
    }
    if TWO_AUTHORS_RE.is_match(line) && segments.len() == 2 && name_segments == 2 {
        score += 2;
    }
    if has_marks || has_initials {
        score += 1;
    }
    if total_words > 0 && name_words * 10 >= total_words * 9 {
        score += 1;
    }
    if has_lowercase_word {
        score -= 2;
    }

    score
}

pub fn is_author_line(line: &str) -> bool {
    author_line_score(line) >= AUTHOR_LINE_THRESHOLD
}

/// Department, institution or contact line.
pub fn is_affiliation_line(line: &str) -> bool {
    AFFILIATION_RE.is_match(line)
}
