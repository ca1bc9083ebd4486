use regex::Regex;

use tocmatch_core::config_file::ExtractionSection;

use crate::boilerplate::{BoilerplateKind, BoilerplatePattern};

/// Controls how a list of patterns/values is overridden from its defaults.
#[derive(Debug, Clone)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T> Default for ListOverride<T> {
    fn default() -> Self {
        ListOverride::Default
    }
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }

    fn push(&mut self, value: T) {
        match self {
            ListOverride::Replace(v) | ListOverride::Extend(v) => v.push(value),
            ListOverride::Default => *self = ListOverride::Extend(vec![value]),
        }
    }

    fn try_map<U, E>(self, f: impl Fn(T) -> Result<U, E>) -> Result<ListOverride<U>, E> {
        Ok(match self {
            ListOverride::Default => ListOverride::Default,
            ListOverride::Replace(v) => {
                ListOverride::Replace(v.into_iter().map(f).collect::<Result<_, _>>()?)
            }
            ListOverride::Extend(v) => {
                ListOverride::Extend(v.into_iter().map(f).collect::<Result<_, _>>()?)
            }
        })
    }
}

/// Configuration for title extraction.
///
/// Use [`ExtractionConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Leading pages whose text is considered (default: 2).
    pub(crate) max_pages: usize,
    /// Most lines a title may span (default: 4).
    pub(crate) max_title_lines: usize,
    /// Titles shorter than this many characters are rejected (default: 5).
    pub(crate) min_title_chars: usize,
    /// How far past the header the section-marker scan looks (default: 15).
    pub(crate) marker_search_lines: usize,
    pub(crate) section_markers: ListOverride<String>,
    pub(crate) boilerplate: ListOverride<BoilerplatePattern>,
    /// Front-matter and affiliation lines that end the title block.
    pub(crate) stop_patterns: ListOverride<Regex>,
    pub(crate) compound_suffixes: ListOverride<String>,
    /// Fall back to the longest plausible line when assembly fails (default: off).
    pub(crate) longest_line_fallback: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: 2,
            max_title_lines: 4,
            min_title_chars: 5,
            marker_search_lines: 15,
            section_markers: ListOverride::Default,
            boilerplate: ListOverride::Default,
            stop_patterns: ListOverride::Default,
            compound_suffixes: ListOverride::Default,
            longest_line_fallback: false,
        }
    }
}

impl ExtractionConfig {
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn max_title_lines(&self) -> usize {
        self.max_title_lines
    }

    pub fn min_title_chars(&self) -> usize {
        self.min_title_chars
    }
}

/// Builder for [`ExtractionConfig`].
///
/// Accepts string patterns that are compiled to `Regex` in [`build()`](Self::build).
/// Fails fast with `regex::Error` if any pattern is invalid.
#[derive(Debug, Clone, Default)]
pub struct ExtractionConfigBuilder {
    max_pages: Option<usize>,
    max_title_lines: Option<usize>,
    min_title_chars: Option<usize>,
    marker_search_lines: Option<usize>,
    section_markers: ListOverride<String>,
    boilerplate: ListOverride<(BoilerplateKind, String)>,
    stop_patterns: ListOverride<String>,
    compound_suffixes: ListOverride<String>,
    longest_line_fallback: Option<bool>,
}

impl ExtractionConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scalars ──

    pub fn max_pages(mut self, n: usize) -> Self {
        self.max_pages = Some(n);
        self
    }

    pub fn max_title_lines(mut self, n: usize) -> Self {
        self.max_title_lines = Some(n);
        self
    }

    pub fn min_title_chars(mut self, n: usize) -> Self {
        self.min_title_chars = Some(n);
        self
    }

    pub fn marker_search_lines(mut self, n: usize) -> Self {
        self.marker_search_lines = Some(n);
        self
    }

    pub fn longest_line_fallback(mut self, enabled: bool) -> Self {
        self.longest_line_fallback = Some(enabled);
        self
    }

    // ── Section markers ──

    pub fn set_section_markers(mut self, markers: Vec<String>) -> Self {
        self.section_markers = ListOverride::Replace(markers);
        self
    }

    pub fn add_section_marker(mut self, marker: String) -> Self {
        self.section_markers.push(marker);
        self
    }

    // ── Boilerplate ──

    pub fn set_boilerplate_patterns(mut self, patterns: Vec<(BoilerplateKind, String)>) -> Self {
        self.boilerplate = ListOverride::Replace(patterns);
        self
    }

    pub fn add_boilerplate_pattern(mut self, kind: BoilerplateKind, pattern: String) -> Self {
        self.boilerplate.push((kind, pattern));
        self
    }

    // ── Stop patterns ──

    pub fn set_stop_patterns(mut self, patterns: Vec<String>) -> Self {
        self.stop_patterns = ListOverride::Replace(patterns);
        self
    }

    pub fn add_stop_pattern(mut self, pattern: String) -> Self {
        self.stop_patterns.push(pattern);
        self
    }

    // ── Compound suffixes ──

    pub fn set_compound_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.compound_suffixes = ListOverride::Replace(suffixes);
        self
    }

    pub fn add_compound_suffix(mut self, suffix: String) -> Self {
        self.compound_suffixes.push(suffix);
        self
    }

    /// Layer an `[extraction]` config-file section over this builder.
    pub fn apply_file_section(mut self, section: &ExtractionSection) -> Self {
        if let Some(n) = section.max_pages {
            self = self.max_pages(n);
        }
        if let Some(n) = section.max_title_lines {
            self = self.max_title_lines(n);
        }
        if let Some(n) = section.min_title_chars {
            self = self.min_title_chars(n);
        }
        if let Some(n) = section.marker_search_lines {
            self = self.marker_search_lines(n);
        }
        if let Some(markers) = &section.section_markers {
            self = self.set_section_markers(markers.clone());
        }
        for marker in section.extra_section_markers.iter().flatten() {
            self = self.add_section_marker(marker.clone());
        }
        for entry in section.extra_boilerplate.iter().flatten() {
            self = self
                .add_boilerplate_pattern(BoilerplateKind::parse(&entry.kind), entry.pattern.clone());
        }
        if let Some(enabled) = section.longest_line_fallback {
            self = self.longest_line_fallback(enabled);
        }
        self
    }

    /// Compile all string patterns into regexes and produce an [`ExtractionConfig`].
    pub fn build(self) -> Result<ExtractionConfig, regex::Error> {
        let defaults = ExtractionConfig::default();
        Ok(ExtractionConfig {
            max_pages: self.max_pages.unwrap_or(defaults.max_pages),
            max_title_lines: self.max_title_lines.unwrap_or(defaults.max_title_lines),
            min_title_chars: self.min_title_chars.unwrap_or(defaults.min_title_chars),
            marker_search_lines: self
                .marker_search_lines
                .unwrap_or(defaults.marker_search_lines),
            section_markers: self.section_markers,
            boilerplate: self
                .boilerplate
                .try_map(|(kind, pattern)| BoilerplatePattern::new(kind, &pattern))?,
            stop_patterns: self.stop_patterns.try_map(|p| Regex::new(&p))?,
            compound_suffixes: self.compound_suffixes,
            longest_line_fallback: self
                .longest_line_fallback
                .unwrap_or(defaults.longest_line_fallback),
        })
    }
}
