//! Effective settings: CLI flags > environment > config file > defaults.

use std::path::Path;

use anyhow::Context;
use tocmatch_core::MatcherConfig;
use tocmatch_core::ScorePolicy;
use tocmatch_core::config_file::{self, ConfigFile};
use tocmatch_parsing::{ExtractionConfig, ExtractionConfigBuilder};
use tocmatch_reporting::ExportFormat;

pub const ENV_THRESHOLD: &str = "TOCMATCH_THRESHOLD";
pub const ENV_MAX_PAGES: &str = "TOCMATCH_MAX_PAGES";

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub threshold: Option<u8>,
    pub policy: Option<ScorePolicy>,
    pub max_pages: Option<usize>,
    pub max_title_lines: Option<usize>,
    pub section_markers: Vec<String>,
    pub report_format: Option<ExportFormat>,
}

#[derive(Debug)]
pub struct Settings {
    pub extraction: ExtractionConfig,
    pub matcher: MatcherConfig,
    pub report_format: ExportFormat,
}

/// The explicit `--config` file, or the usual cascade when none is given.
pub fn load_config_file(explicit: Option<&Path>) -> anyhow::Result<ConfigFile> {
    match explicit {
        Some(path) => config_file::try_load_from_path(path)
            .with_context(|| format!("failed to load config file {}", path.display())),
        None => Ok(config_file::load_config()),
    }
}

fn env_number<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> anyhow::Result<Option<T>> {
    match env(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("{name} must be a non-negative integer, got {raw:?}")),
        _ => Ok(None),
    }
}

/// Resolve settings from the three layers. `env` looks up an environment
/// variable.
pub fn resolve(
    file: &ConfigFile,
    cli: &Overrides,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut builder = ExtractionConfigBuilder::new();
    if let Some(section) = &file.extraction {
        builder = builder.apply_file_section(section);
    }
    if let Some(n) = cli.max_pages.or(env_number(&env, ENV_MAX_PAGES)?) {
        builder = builder.max_pages(n);
    }
    if let Some(n) = cli.max_title_lines {
        builder = builder.max_title_lines(n);
    }
    for marker in &cli.section_markers {
        builder = builder.add_section_marker(marker.clone());
    }
    let extraction = builder
        .build()
        .context("invalid pattern in [extraction] config")?;
    if extraction.max_pages() == 0 {
        anyhow::bail!("max_pages must be at least 1");
    }
    if extraction.max_title_lines() == 0 {
        anyhow::bail!("max_title_lines must be at least 1");
    }

    let mut matcher = file.matcher_config()?;
    if let Some(t) = cli.threshold.or(env_number(&env, ENV_THRESHOLD)?) {
        matcher.threshold = t;
    }
    if let Some(policy) = cli.policy {
        matcher.policy = policy;
    }
    matcher.validate()?;

    let report_format = match cli.report_format {
        Some(format) => format,
        None => match file.output.as_ref().and_then(|o| o.report_format.as_deref()) {
            Some(name) => name.parse().context("invalid [output] report_format")?,
            None => ExportFormat::default(),
        },
    };

    tracing::debug!(
        threshold = matcher.threshold,
        policy = ?matcher.policy,
        max_pages = extraction.max_pages(),
        max_title_lines = extraction.max_title_lines(),
        "resolved settings"
    );

    Ok(Settings {
        extraction,
        matcher,
        report_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tocmatch_core::config_file::{ExtractionSection, MatchingSection, OutputSection};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn file_with(threshold: u8, max_pages: usize) -> ConfigFile {
        ConfigFile {
            extraction: Some(ExtractionSection {
                max_pages: Some(max_pages),
                ..Default::default()
            }),
            matching: Some(MatchingSection {
                threshold: Some(threshold),
                ..Default::default()
            }),
            output: Some(OutputSection {
                report_format: Some("text".into()),
            }),
        }
    }

    #[test]
    fn test_defaults() {
        let s = resolve(&ConfigFile::default(), &Overrides::default(), no_env).unwrap();
        assert_eq!(s.matcher, MatcherConfig::default());
        assert_eq!(s.extraction.max_pages(), 2);
        assert_eq!(s.extraction.max_title_lines(), 4);
        assert_eq!(s.report_format, ExportFormat::Json);
    }

    #[test]
    fn test_file_over_defaults() {
        let s = resolve(&file_with(75, 3), &Overrides::default(), no_env).unwrap();
        assert_eq!(s.matcher.threshold, 75);
        assert_eq!(s.extraction.max_pages(), 3);
        assert_eq!(s.report_format, ExportFormat::Text);
    }

    #[test]
    fn test_env_over_file() {
        let env = |name: &str| match name {
            ENV_THRESHOLD => Some("80".to_string()),
            ENV_MAX_PAGES => Some(" 1 ".to_string()),
            _ => None,
        };
        let s = resolve(&file_with(75, 3), &Overrides::default(), env).unwrap();
        assert_eq!(s.matcher.threshold, 80);
        assert_eq!(s.extraction.max_pages(), 1);
    }

    #[test]
    fn test_cli_over_env() {
        let env = |name: &str| (name == ENV_THRESHOLD).then(|| "80".to_string());
        let cli = Overrides {
            threshold: Some(90),
            max_title_lines: Some(2),
            policy: Some(ScorePolicy::Min),
            report_format: Some(ExportFormat::Csv),
            ..Default::default()
        };
        let s = resolve(&file_with(75, 3), &cli, env).unwrap();
        assert_eq!(s.matcher.threshold, 90);
        assert_eq!(s.matcher.policy, ScorePolicy::Min);
        assert_eq!(s.extraction.max_title_lines(), 2);
        assert_eq!(s.report_format, ExportFormat::Csv);
    }

    #[test]
    fn test_invalid_env_value() {
        let env = |name: &str| (name == ENV_THRESHOLD).then(|| "high".to_string());
        let err = resolve(&ConfigFile::default(), &Overrides::default(), env).unwrap_err();
        assert!(err.to_string().contains(ENV_THRESHOLD));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let cli = Overrides {
            threshold: Some(150),
            ..Default::default()
        };
        assert!(resolve(&ConfigFile::default(), &cli, no_env).is_err());
    }

    #[test]
    fn test_zero_pages_rejected() {
        let cli = Overrides {
            max_pages: Some(0),
            ..Default::default()
        };
        assert!(resolve(&ConfigFile::default(), &cli, no_env).is_err());
    }

    #[test]
    fn test_zero_title_lines_rejected() {
        let cli = Overrides {
            max_title_lines: Some(0),
            ..Default::default()
        };
        let err = resolve(&ConfigFile::default(), &cli, no_env).unwrap_err();
        assert!(err.to_string().contains("max_title_lines"));

        let file = ConfigFile {
            extraction: Some(ExtractionSection {
                max_title_lines: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(resolve(&file, &Overrides::default(), no_env).is_err());
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tocmatch.toml");
        std::fs::write(&path, "[matching]\nthreshold = 70\npolicy = \"mean\"\n").unwrap();

        let file = load_config_file(Some(&path)).unwrap();
        let s = resolve(&file, &Overrides::default(), no_env).unwrap();
        assert_eq!(s.matcher.threshold, 70);
        assert_eq!(s.matcher.policy, ScorePolicy::Mean);

        std::fs::write(&path, "[matching\n").unwrap();
        assert!(load_config_file(Some(&path)).is_err());
    }

    #[test]
    fn test_extra_section_marker_from_cli() {
        let cli = Overrides {
            section_markers: vec!["BRIEF COMMUNICATION".into()],
            ..Default::default()
        };
        let s = resolve(&ConfigFile::default(), &cli, no_env).unwrap();
        let extractor = tocmatch_parsing::TitleExtractor::with_config(s.extraction);
        assert!(extractor.is_section_marker("Brief Communication"));
        assert!(extractor.is_section_marker("ORIGINAL ARTICLE"));
    }
}
