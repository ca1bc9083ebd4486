use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Common compound-word suffixes that should keep the hyphen.
pub(crate) const COMPOUND_SUFFIXES: &[&str] = &[
    "based",
    "driven",
    "oriented",
    "dependent",
    "independent",
    "like",
    "free",
    "scale",
    "level",
    "order",
    "time",
    "type",
    "mode",
    "loop",
    "state",
    "phase",
    "axis",
    "wheel",
    "wall",
    "layer",
    "step",
    "sensitive",
    "assisted",
    "controlled",
    "integrated",
    "enabled",
    "powered",
    "resolution",
    "efficient",
    "invariant",
];

/// Expand common typographic ligatures found in PDFs.
pub fn expand_ligatures(text: &str) -> String {
    text.replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace(['\u{FB05}', '\u{FB06}'], "st")
}

/// Fix hyphenation from PDF line breaks while preserving compound words.
///
/// - `"Opti-\ncal"` → `"Optical"` (syllable break)
/// - `"Model-\nBased"` → `"Model-Based"` (compound word)
/// - `"2x2-\nSCB"` → `"2x2-SCB"` (digit before the hyphen)
pub fn fix_hyphenation(text: &str, compound_suffixes: &HashSet<String>) -> String {
    static RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)-\s+(\w)(\w*)").unwrap());

    RE.replace_all(text, |caps: &regex::Captures| {
        let before = &caps[1];
        let after_word = format!("{}{}", &caps[2], &caps[3]);

        if before.chars().last().is_some_and(|c| c.is_ascii_digit()) {
            return format!("{before}-{after_word}");
        }
        // A capitalized continuation is a new word in title case ("Real-\nTime").
        if after_word.chars().next().is_some_and(char::is_uppercase) {
            return format!("{before}-{after_word}");
        }
        if compound_suffixes.contains(&after_word.to_lowercase()) {
            return format!("{before}-{after_word}");
        }
        format!("{before}{after_word}")
    })
    .into_owned()
}

/// Collapse every whitespace run (including newlines) to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) fn default_suffix_set() -> HashSet<String> {
    COMPOUND_SUFFIXES.iter().map(|s| s.to_string()).collect()
}
