use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use tocmatch_core::{ExtractedTitle, ExtractionError, PdfDocument, TitleSource};

use crate::authors::{is_affiliation_line, is_author_line};
use crate::boilerplate::{self, BoilerplateKind, BoilerplatePattern, DEFAULT_BOILERPLATE};
use crate::config::ExtractionConfig;
use crate::markers::{DEFAULT_SECTION_MARKERS, DEFAULT_STOP_PATTERNS, marker_key};
use crate::text_processing::{COMPOUND_SUFFIXES, expand_ligatures};
use crate::title::clean_title;

/// Lines considered by the longest-line fallback.
const FALLBACK_SEARCH_LINES: usize = 20;
const FALLBACK_MIN_CHARS: usize = 15;
const FALLBACK_MAX_CHARS: usize = 200;

/// Why title assembly stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BlankLine,
    AuthorLine,
    Affiliation,
    FrontMatter,
    Boilerplate,
    SectionMarker,
    TerminalPunctuation,
    LineCap,
    EndOfText,
}

/// A title together with how it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TitleTrace {
    pub title: String,
    /// The section marker line the title followed, if one was found.
    pub marker: Option<String>,
    /// Boilerplate lines skipped before the title, with their category.
    pub skipped: Vec<(String, String)>,
    /// Raw lines the title was assembled from.
    pub lines: Vec<String>,
    pub stop: StopReason,
    pub used_fallback: bool,
}

/// Pulls an article title out of the text of a PDF's first pages.
///
/// Pipeline:
/// 1. Join the first `max_pages` pages, expand ligatures, split into trimmed lines
/// 2. Skip leading boilerplate (copyright, running headers, page numbers)
/// 3. Look for a section marker (`ORIGINAL ARTICLE`, …); the title follows it
/// 4. Take the first remaining line, then append lines until a byline,
///    affiliation, blank line, front-matter label or the line cap
/// 5. Clean the joined text; reject it if it is too short
pub struct TitleExtractor {
    config: ExtractionConfig,
    markers: HashSet<String>,
    boilerplate: Vec<BoilerplatePattern>,
    stop_patterns: Vec<Regex>,
    compound_suffixes: HashSet<String>,
}

impl Default for TitleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TitleExtractor {
    /// Create an extractor with default configuration.
    pub fn new() -> Self {
        Self::with_config(ExtractionConfig::default())
    }

    /// Create an extractor with a custom configuration.
    pub fn with_config(config: ExtractionConfig) -> Self {
        let default_markers: Vec<String> =
            DEFAULT_SECTION_MARKERS.iter().map(|s| s.to_string()).collect();
        let markers = config
            .section_markers
            .resolve(&default_markers)
            .iter()
            .map(|m| marker_key(m))
            .filter(|m| !m.is_empty())
            .collect();
        let default_suffixes: Vec<String> = COMPOUND_SUFFIXES.iter().map(|s| s.to_string()).collect();
        let compound_suffixes = config
            .compound_suffixes
            .resolve(&default_suffixes)
            .into_iter()
            .map(|s| s.to_lowercase())
            .collect();

        Self {
            boilerplate: config.boilerplate.resolve(&DEFAULT_BOILERPLATE),
            stop_patterns: config.stop_patterns.resolve(&DEFAULT_STOP_PATTERNS),
            markers,
            compound_suffixes,
            config,
        }
    }

    /// Get a reference to the current config.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn is_section_marker(&self, line: &str) -> bool {
        !line.trim().is_empty() && self.markers.contains(&marker_key(line))
    }

    pub fn boilerplate_kind(&self, line: &str) -> Option<&BoilerplateKind> {
        boilerplate::classify(line, &self.boilerplate)
    }

    fn is_front_matter(&self, line: &str) -> bool {
        self.stop_patterns.iter().any(|re| re.is_match(line))
    }

    /// Best-guess title for the given page texts.
    pub fn extract_title_from_pages(&self, pages: &[String]) -> Result<String, ExtractionError> {
        self.trace_pages(pages).map(|trace| trace.title)
    }

    /// Like [`extract_title_from_pages`](Self::extract_title_from_pages),
    /// keeping the intermediate decisions.
    pub fn trace_pages(&self, pages: &[String]) -> Result<TitleTrace, ExtractionError> {
        let text = pages
            .iter()
            .take(self.config.max_pages)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        let text = expand_ligatures(&text);
        let lines: Vec<&str> = text.lines().map(str::trim).collect();

        if lines.iter().all(|l| l.is_empty()) {
            return Err(ExtractionError::EmptyText);
        }

        let mut skipped = Vec::new();
        let mut cursor = self.skip_preamble(&lines, 0, false, &mut skipped);

        let window_end = (cursor + self.config.marker_search_lines).min(lines.len());
        let marker_pos = (cursor..window_end).find(|&i| self.is_section_marker(lines[i]));
        if let Some(pos) = marker_pos {
            cursor = self.skip_preamble(&lines, pos + 1, true, &mut skipped);
        }

        let (title_lines, stop) = self.assemble(&lines[cursor..]);
        let candidate = clean_title(&title_lines, &self.compound_suffixes);

        let marker = marker_pos.map(|p| lines[p].to_string());

        if self.long_enough(&candidate) {
            return Ok(TitleTrace {
                title: candidate,
                marker,
                skipped,
                lines: title_lines.iter().map(|l| l.to_string()).collect(),
                stop,
                used_fallback: false,
            });
        }

        if self.config.longest_line_fallback
            && let Some(line) = self.longest_plausible_line(&lines)
        {
            let title = clean_title(&[line], &self.compound_suffixes);
            if self.long_enough(&title) {
                tracing::debug!(title = %title, "using longest-line fallback");
                return Ok(TitleTrace {
                    title,
                    marker,
                    skipped,
                    lines: vec![line.to_string()],
                    stop,
                    used_fallback: true,
                });
            }
        }

        Err(ExtractionError::TitleTooShort { candidate })
    }

    fn long_enough(&self, title: &str) -> bool {
        !title.is_empty() && title.chars().count() >= self.config.min_title_chars
    }

    /// Advance past blank and boilerplate lines (and marker lines, if asked).
    fn skip_preamble(
        &self,
        lines: &[&str],
        mut cursor: usize,
        skip_markers: bool,
        skipped: &mut Vec<(String, String)>,
    ) -> usize {
        while let Some(line) = lines.get(cursor) {
            if line.is_empty() || (skip_markers && self.is_section_marker(line)) {
                cursor += 1;
            } else if let Some(kind) = self.boilerplate_kind(line) {
                skipped.push((kind.to_string(), line.to_string()));
                cursor += 1;
            } else {
                break;
            }
        }
        cursor
    }

    /// Collect title lines from the start of `lines`.
    ///
    /// The first line is the title start and only a front-matter label can
    /// reject it; the remaining checks apply from the second line on.
    fn assemble<'a>(&self, lines: &[&'a str]) -> (Vec<&'a str>, StopReason) {
        let mut title = Vec::new();

        for (i, &line) in lines.iter().enumerate() {
            if title.len() >= self.config.max_title_lines {
                return (title, StopReason::LineCap);
            }
            if line.is_empty() {
                return (title, StopReason::BlankLine);
            }
            if self.is_front_matter(line) {
                return (title, StopReason::FrontMatter);
            }
            if i > 0
                && let Some(stop) = self.continuation_stop(line)
            {
                return (title, stop);
            }

            title.push(line);
            if line.ends_with(['.', '?', '!']) {
                return (title, StopReason::TerminalPunctuation);
            }
        }

        (title, StopReason::EndOfText)
    }

    fn continuation_stop(&self, line: &str) -> Option<StopReason> {
        if self.is_section_marker(line) {
            Some(StopReason::SectionMarker)
        } else if self.boilerplate_kind(line).is_some() {
            Some(StopReason::Boilerplate)
        } else if is_affiliation_line(line) {
            Some(StopReason::Affiliation)
        } else if is_author_line(line) {
            Some(StopReason::AuthorLine)
        } else {
            None
        }
    }

    /// Longest line near the top of the text that could plausibly be a title.
    fn longest_plausible_line<'a>(&self, lines: &[&'a str]) -> Option<&'a str> {
        let mut best: Option<&'a str> = None;
        for &line in lines.iter().take(FALLBACK_SEARCH_LINES) {
            let len = line.chars().count();
            if !(FALLBACK_MIN_CHARS..=FALLBACK_MAX_CHARS).contains(&len)
                || self.boilerplate_kind(line).is_some()
                || self.is_section_marker(line)
                || self.is_front_matter(line)
                || is_affiliation_line(line)
                || is_author_line(line)
            {
                continue;
            }
            if best.is_none_or(|b| len > b.chars().count()) {
                best = Some(line);
            }
        }
        best
    }
}

impl TitleSource for TitleExtractor {
    fn extract_title(&self, document: &PdfDocument) -> Result<ExtractedTitle, ExtractionError> {
        let trace = self.trace_pages(&document.pages)?;
        tracing::debug!(
            file = %document.filename,
            title = %trace.title,
            marker = ?trace.marker,
            stop = ?trace.stop,
            fallback = trace.used_fallback,
            "extracted title"
        );
        Ok(ExtractedTitle {
            source_filename: document.filename.clone(),
            text: trace.title,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfigBuilder;

    fn pages(text: &str) -> Vec<String> {
        vec![text.to_string()]
    }

    fn title(text: &str) -> Result<String, ExtractionError> {
        TitleExtractor::new().extract_title_from_pages(&pages(text))
    }

    // =========================================================================
    // Title assembly
    // =========================================================================

    #[test]
    fn test_marker_then_two_line_title_then_authors() {
        let text = "ORIGINAL ARTICLE\nCharacterization of an 2x2 SCB Optical\nSwitch Integrated with VOA\nHen-Wei Huang and Yao-Joe Yang";
        assert_eq!(
            title(text).unwrap(),
            "Characterization of an 2x2 SCB Optical Switch Integrated with VOA"
        );

        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.marker.as_deref(), Some("ORIGINAL ARTICLE"));
        assert_eq!(trace.stop, StopReason::AuthorLine);
        assert_eq!(trace.lines.len(), 2);
        assert!(!trace.used_fallback);
    }

    #[test]
    fn test_header_boilerplate_skipped() {
        let text = "International Journal of Automation and Smart Technology\n\
                    www.ausmt.org\n\
                    AUSMT Vol. 2 No. 3 (2012)\n\
                    Copyright © 2012 International Journal of Automation and Smart Technology\n\
                    EDITORIAL\n\
                    Energy Saving Trends\n\
                    Jia-Yush Yen, Fu-Cheng Wang\n\
                    Abstract";
        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Energy Saving Trends");
        assert_eq!(trace.marker.as_deref(), Some("EDITORIAL"));
    }

    #[test]
    fn test_no_marker_uses_first_content_line() {
        let text = "217\nAUSMT Vol. 1 No. 1 (2011)\n\nEnergy Saving Trends\n\nAbstract";
        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Energy Saving Trends");
        assert_eq!(trace.marker, None);
        assert_eq!(trace.stop, StopReason::BlankLine);
        let kinds: Vec<&str> = trace.skipped.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(kinds, vec!["page_number", "running_header"]);
    }

    #[test]
    fn test_stops_at_affiliation_line() {
        let text = "Robust Control of Mobile Robots\nDepartment of Mechanical Engineering\nTaipei";
        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Robust Control of Mobile Robots");
        assert_eq!(trace.stop, StopReason::Affiliation);
    }

    #[test]
    fn test_journal_name_header_without_marker() {
        let text = "International Journal of Automation and Smart Technology\n\
                    Energy Saving Trends\n\
                    Jia-Yush Yen, Fu-Cheng Wang";
        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Energy Saving Trends");
        assert_eq!(trace.marker, None);
        assert_eq!(trace.stop, StopReason::AuthorLine);
        assert_eq!(trace.skipped[0].0, "running_header");
    }

    #[test]
    fn test_name_like_first_line_is_kept() {
        let text = "EDITORIAL\nIntelligent Vehicles and Smart Grids\nJia-Yush Yen, Fu-Cheng Wang";
        let trace = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Intelligent Vehicles and Smart Grids");
        assert_eq!(trace.stop, StopReason::AuthorLine);
    }

    #[test]
    fn test_affiliation_like_first_line_is_kept() {
        let text = "ORIGINAL ARTICLE\n\
                    University Laboratory Automation with Smart Robots\n\
                    Ann Lee and Bob Chen";
        assert_eq!(
            title(text).unwrap(),
            "University Laboratory Automation with Smart Robots"
        );
    }

    #[test]
    fn test_front_matter_label_never_starts_title() {
        assert!(matches!(
            title("EDITORIAL\nAbstract\nThis issue collects papers on energy saving"),
            Err(ExtractionError::TitleTooShort { .. })
        ));
    }

    #[test]
    fn test_line_cap() {
        let extractor = TitleExtractor::with_config(
            ExtractionConfigBuilder::new().max_title_lines(2).build().unwrap(),
        );
        let text = "A Study of the Effects of\nVibration on the Accuracy of\nPrecision Machine Tools";
        let trace = extractor.trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "A Study of the Effects of Vibration on the Accuracy of");
        assert_eq!(trace.stop, StopReason::LineCap);
    }

    #[test]
    fn test_terminal_punctuation_ends_title() {
        let text = "Why Do Robots Fail?\nA system overview follows here";
        assert_eq!(title(text).unwrap(), "Why Do Robots Fail?");
    }

    #[test]
    fn test_wrapped_hyphenation_and_ligatures() {
        let text = "REVIEW ARTICLE\nEﬃcient Opti-\ncal Switching";
        assert_eq!(title(text).unwrap(), "Efficient Optical Switching");
    }

    #[test]
    fn test_only_first_pages_considered() {
        let extractor = TitleExtractor::with_config(
            ExtractionConfigBuilder::new().max_pages(1).build().unwrap(),
        );
        let pages = vec!["   ".to_string(), "Energy Saving Trends".to_string()];
        assert_eq!(
            extractor.extract_title_from_pages(&pages),
            Err(ExtractionError::EmptyText)
        );
    }

    // =========================================================================
    // Failures and fallback
    // =========================================================================

    #[test]
    fn test_empty_text() {
        assert_eq!(title(""), Err(ExtractionError::EmptyText));
        assert_eq!(title(" \n\n \t"), Err(ExtractionError::EmptyText));
        assert_eq!(
            TitleExtractor::new().extract_title_from_pages(&[]),
            Err(ExtractionError::EmptyText)
        );
    }

    #[test]
    fn test_too_short() {
        assert_eq!(
            title("EDITORIAL\nAbc\n\nBody text"),
            Err(ExtractionError::TitleTooShort {
                candidate: "Abc".into()
            })
        );
    }

    #[test]
    fn test_only_boilerplate_is_too_short() {
        assert_eq!(
            title("www.ausmt.org\n12"),
            Err(ExtractionError::TitleTooShort {
                candidate: String::new()
            })
        );
    }

    #[test]
    fn test_longest_line_fallback() {
        let text = "EDITORIAL\nAbstract\nThis issue collects papers on energy saving";
        assert!(matches!(
            title(text),
            Err(ExtractionError::TitleTooShort { .. })
        ));

        let extractor = TitleExtractor::with_config(
            ExtractionConfigBuilder::new()
                .longest_line_fallback(true)
                .build()
                .unwrap(),
        );
        let trace = extractor.trace_pages(&pages(text)).unwrap();
        assert!(trace.used_fallback);
        assert_eq!(trace.title, "This issue collects papers on energy saving");
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    #[test]
    fn test_custom_marker() {
        let text = "PERSPECTIVE\nEnergy Saving Trends\nJia-Yush Yen, Fu-Cheng Wang";
        let default = TitleExtractor::new().trace_pages(&pages(text)).unwrap();
        assert_eq!(default.title, "PERSPECTIVE Energy Saving Trends");

        let extractor = TitleExtractor::with_config(
            ExtractionConfigBuilder::new()
                .add_section_marker("Perspective".into())
                .build()
                .unwrap(),
        );
        let trace = extractor.trace_pages(&pages(text)).unwrap();
        assert_eq!(trace.title, "Energy Saving Trends");
    }

    #[test]
    fn test_custom_boilerplate() {
        let text = "Smart Science 2014\nEnergy Saving Trends";
        let extractor = TitleExtractor::with_config(
            ExtractionConfigBuilder::new()
                .add_boilerplate_pattern(
                    BoilerplateKind::RunningHeader,
                    r"(?i)^smart science \d{4}$".into(),
                )
                .build()
                .unwrap(),
        );
        assert_eq!(
            extractor.extract_title_from_pages(&pages(text)).unwrap(),
            "Energy Saving Trends"
        );
    }

    #[test]
    fn test_title_source_tags_filename() {
        let doc = PdfDocument::new("0042.pdf", pages("EDITORIAL\nEnergy Saving Trends"));
        let extracted = TitleExtractor::new().extract_title(&doc).unwrap();
        assert_eq!(extracted.source_filename, "0042.pdf");
        assert_eq!(extracted.text, "Energy Saving Trends");
    }
}
