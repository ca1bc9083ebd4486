use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::CoreError;
use crate::matching::{MatcherConfig, ScorePolicy};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub extraction: Option<ExtractionSection>,
    pub matching: Option<MatchingSection>,
    pub output: Option<OutputSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSection {
    pub max_pages: Option<usize>,
    pub max_title_lines: Option<usize>,
    pub min_title_chars: Option<usize>,
    pub marker_search_lines: Option<usize>,
    /// Replaces the built-in section marker vocabulary.
    pub section_markers: Option<Vec<String>>,
    /// Added on top of the built-in (or replaced) vocabulary.
    pub extra_section_markers: Option<Vec<String>>,
    pub extra_boilerplate: Option<Vec<BoilerplateEntry>>,
    pub longest_line_fallback: Option<bool>,
}

/// A user-supplied boilerplate regex and the category it reports under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoilerplateEntry {
    pub kind: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingSection {
    pub threshold: Option<u8>,
    pub policy: Option<ScorePolicy>,
    pub ambiguity_margin: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    pub report_format: Option<String>,
}

impl ConfigFile {
    /// Matcher settings from the `[matching]` section, defaults filled in.
    pub fn matcher_config(&self) -> Result<MatcherConfig, CoreError> {
        let defaults = MatcherConfig::default();
        let section = self.matching.clone().unwrap_or_default();
        let config = MatcherConfig {
            threshold: section.threshold.unwrap_or(defaults.threshold),
            policy: section.policy.unwrap_or(defaults.policy),
            ambiguity_margin: section.ambiguity_margin.unwrap_or(defaults.ambiguity_margin),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Platform config directory path: `<config_dir>/tocmatch/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tocmatch").join("config.toml"))
}

/// Load config by cascading CWD `.tocmatch.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    load_cascade(config_path().as_deref(), Path::new(".tocmatch.toml"))
}

/// Cascade `local` over `platform`. Missing or malformed files are skipped.
pub fn load_cascade(platform: Option<&Path>, local: &Path) -> ConfigFile {
    let platform = platform.and_then(load_from_path);
    let local = load_from_path(local);

    match (platform, local) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed; parse errors are logged.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    match try_load_from_path(path) {
        Ok(config) => Some(config),
        Err(CoreError::Io(_)) => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
            None
        }
    }
}

pub fn try_load_from_path(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let be = base.extraction.unwrap_or_default();
    let oe = overlay.extraction.unwrap_or_default();
    let bm = base.matching.unwrap_or_default();
    let om = overlay.matching.unwrap_or_default();
    let bo = base.output.unwrap_or_default();
    let oo = overlay.output.unwrap_or_default();

    ConfigFile {
        extraction: Some(ExtractionSection {
            max_pages: oe.max_pages.or(be.max_pages),
            max_title_lines: oe.max_title_lines.or(be.max_title_lines),
            min_title_chars: oe.min_title_chars.or(be.min_title_chars),
            marker_search_lines: oe.marker_search_lines.or(be.marker_search_lines),
            section_markers: oe.section_markers.or(be.section_markers),
            extra_section_markers: oe.extra_section_markers.or(be.extra_section_markers),
            extra_boilerplate: oe.extra_boilerplate.or(be.extra_boilerplate),
            longest_line_fallback: oe.longest_line_fallback.or(be.longest_line_fallback),
        }),
        matching: Some(MatchingSection {
            threshold: om.threshold.or(bm.threshold),
            policy: om.policy.or(bm.policy),
            ambiguity_margin: om.ambiguity_margin.or(bm.ambiguity_margin),
        }),
        output: Some(OutputSection {
            report_format: oo.report_format.or(bo.report_format),
        }),
    }
}
