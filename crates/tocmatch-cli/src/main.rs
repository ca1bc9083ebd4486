use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tocmatch_core::{LinkEvent, Linker, Matcher, RecordIndex, ScorePolicy};
use tocmatch_ingest::PdfDirectory;
use tocmatch_parsing::TitleExtractor;
use tocmatch_reporting::{ExportFormat, RecordTable};

mod output;
mod settings;

use output::ColorMode;
use settings::Overrides;

/// Journal PDF linker - match article PDFs to their table-of-contents records
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file to use instead of .tocmatch.toml / the platform config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the record table from a directory of issue TOC HTML pages
    Toc {
        /// Directory containing *.htm / *.html issue pages
        html_dir: PathBuf,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: csv (record table) or markdown (readable TOC)
        #[arg(long, default_value = "csv")]
        format: TocFormat,
    },

    /// Link a directory of PDFs to the records of a CSV table
    Link {
        /// Record table (CSV with Vol, No, Year, Article, Author, Pages)
        records: PathBuf,

        /// Directory containing the article PDFs
        pdf_dir: PathBuf,

        /// Linked table path (default: <records>_with_filenames.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the linkage report to this path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Report format: json, csv or text (default: from the report
        /// file extension, then the config file)
        #[arg(long)]
        report_format: Option<ExportFormat>,

        /// Minimum combined score (0-100) for a match
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// How per-metric scores are combined: max, mean or min
        #[arg(long)]
        policy: Option<ScorePolicy>,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },

    /// Dry run: print the title extracted from each PDF
    Titles {
        /// Directory containing the article PDFs
        pdf_dir: PathBuf,

        #[command(flatten)]
        extraction: ExtractionArgs,
    },
}

/// What `tocmatch toc` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TocFormat {
    Csv,
    Markdown,
}

impl TocFormat {
    fn label(&self) -> &'static str {
        match self {
            TocFormat::Csv => "CSV",
            TocFormat::Markdown => "Markdown",
        }
    }
}

impl std::str::FromStr for TocFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TocFormat::Csv),
            "markdown" | "md" => Ok(TocFormat::Markdown),
            other => Err(format!("unknown TOC format: {other} (expected csv or markdown)")),
        }
    }
}

#[derive(clap::Args, Debug)]
struct ExtractionArgs {
    /// Leading pages read from each PDF
    #[arg(long)]
    max_pages: Option<usize>,

    /// Most lines a title may span
    #[arg(long)]
    max_title_lines: Option<usize>,

    /// Extra section marker preceding titles (repeatable)
    #[arg(long = "section-marker")]
    section_markers: Vec<String>,
}

impl ExtractionArgs {
    fn overrides(self) -> Overrides {
        Overrides {
            max_pages: self.max_pages,
            max_title_lines: self.max_title_lines,
            section_markers: self.section_markers,
            ..Default::default()
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let color = ColorMode(!cli.no_color);
    let config = settings::load_config_file(cli.config.as_deref())?;

    match cli.command {
        Command::Toc {
            html_dir,
            output,
            format,
        } => toc(&html_dir, output.as_deref(), format, color),
        Command::Link {
            records,
            pdf_dir,
            output,
            report,
            report_format,
            threshold,
            policy,
            extraction,
        } => {
            let report_format = explicit_report_format(report_format, report.as_deref());
            let overrides = Overrides {
                threshold,
                policy,
                report_format,
                ..extraction.overrides()
            };
            let settings = settings::resolve(&config, &overrides, |k| std::env::var(k).ok())?;
            let output = output.unwrap_or_else(|| default_output_path(&records));
            link(
                &records,
                &pdf_dir,
                &output,
                report.as_deref(),
                settings,
                color,
                cli.verbose > 0,
            )
        }
        Command::Titles {
            pdf_dir,
            extraction,
        } => {
            let settings =
                settings::resolve(&config, &extraction.overrides(), |k| std::env::var(k).ok())?;
            titles(&pdf_dir, settings, color)
        }
    }
}

/// `--report-format`, else the format named by the report file's extension.
/// `None` leaves the choice to the config file.
fn explicit_report_format(
    flag: Option<ExportFormat>,
    report: Option<&Path>,
) -> Option<ExportFormat> {
    flag.or_else(|| report.and_then(ExportFormat::from_path))
}

/// `records.csv` → `records_with_filenames.csv` next to it.
fn default_output_path(records: &Path) -> PathBuf {
    let stem = records
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());
    records.with_file_name(format!("{stem}_with_filenames.csv"))
}

fn toc(
    html_dir: &Path,
    output: Option<&Path>,
    format: TocFormat,
    color: ColorMode,
) -> anyhow::Result<()> {
    use anyhow::Context;
    use owo_colors::OwoColorize;

    if !html_dir.is_dir() {
        anyhow::bail!("HTML directory not found: {}", html_dir.display());
    }
    let pages = tocmatch_html::load_directory(html_dir)?;
    let articles: usize = pages.iter().map(|p| p.articles.len()).sum();

    match format {
        TocFormat::Csv => {
            let table = RecordTable::from_records(&tocmatch_html::records_from_pages(&pages));
            match output {
                Some(path) => table.write(path)?,
                None => table.to_writer(std::io::stdout().lock())?,
            }
        }
        TocFormat::Markdown => {
            let markdown = tocmatch_html::render_markdown(&pages);
            match output {
                Some(path) => std::fs::write(path, markdown)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => std::io::stdout().lock().write_all(markdown.as_bytes())?,
            }
        }
    }

    if let Some(path) = output {
        let msg = format!(
            "Wrote {} articles from {} issues to {} ({})",
            articles,
            pages.len(),
            path.display(),
            format.label()
        );
        if color.enabled() {
            println!("{}", msg.green());
        } else {
            println!("{msg}");
        }
    }
    if articles == 0 {
        tracing::warn!(dir = %html_dir.display(), "no articles found");
    }
    Ok(())
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn link(
    records_path: &Path,
    pdf_dir: &Path,
    output_path: &Path,
    report_path: Option<&Path>,
    settings: settings::Settings,
    color: ColorMode,
    verbose: bool,
) -> anyhow::Result<()> {
    if !records_path.exists() {
        anyhow::bail!("Record table not found: {}", records_path.display());
    }
    if !pdf_dir.is_dir() {
        anyhow::bail!("PDF directory not found: {}", pdf_dir.display());
    }

    let mut table = RecordTable::read(records_path)?;
    let records = table.records()?;
    let directory = PdfDirectory::scan(pdf_dir)?;
    let backend = tocmatch_ingest::default_backend()?;

    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "Linking {} PDFs against {} records (threshold {})",
        directory.len(),
        records.len(),
        settings.matcher.threshold
    )?;

    let extractor = TitleExtractor::with_config(settings.extraction);
    let max_pages = extractor.config().max_pages();
    let linker = Linker::new(extractor, Matcher::new(settings.matcher));
    let mut index = RecordIndex::new(records);

    let bar = progress_bar(directory.len());
    let report = {
        let snapshot = index.records().to_vec();
        linker.run_with_progress(
            directory.documents(backend.as_ref(), max_pages),
            &mut index,
            |event| match event {
                LinkEvent::Processing { filename, .. } => bar.set_message(filename.to_string()),
                LinkEvent::Finished { outcome, .. } => {
                    if verbose {
                        bar.println(output::outcome_line(outcome, &snapshot, color));
                    }
                    bar.inc(1);
                }
            },
        )
    };
    bar.finish_and_clear();

    let linked = index.into_records();
    table.apply_links(&linked)?;
    table.write(output_path)?;

    if let Some(path) = report_path {
        tocmatch_reporting::export_report(&report, &linked, settings.report_format, path)?;
    }

    output::print_link_summary(&mut stdout, &report, &linked, color)?;
    writeln!(stdout, "Linked table written to {}", output_path.display())?;
    if let Some(path) = report_path {
        writeln!(
            stdout,
            "Report ({}) written to {}",
            settings.report_format.label(),
            path.display()
        )?;
    }
    Ok(())
}

fn titles(pdf_dir: &Path, settings: settings::Settings, color: ColorMode) -> anyhow::Result<()> {
    use owo_colors::OwoColorize;

    if !pdf_dir.is_dir() {
        anyhow::bail!("PDF directory not found: {}", pdf_dir.display());
    }
    let directory = PdfDirectory::scan(pdf_dir)?;
    let backend = tocmatch_ingest::default_backend()?;
    let extractor = TitleExtractor::with_config(settings.extraction);
    let max_pages = extractor.config().max_pages();

    let mut stdout = std::io::stdout();
    if color.enabled() {
        writeln!(
            stdout,
            "{} {} ({} PDFs)\n",
            "DRY RUN:".bold().cyan(),
            pdf_dir.display().bold(),
            directory.len()
        )?;
    } else {
        writeln!(
            stdout,
            "DRY RUN: {} ({} PDFs)\n",
            pdf_dir.display(),
            directory.len()
        )?;
    }

    let mut extracted = 0;
    for (i, document) in directory.documents(backend.as_ref(), max_pages).enumerate() {
        let (filename, result) = match document {
            Ok(doc) => {
                let result = extractor.trace_pages(&doc.pages);
                (doc.filename, result)
            }
            Err(err) => {
                let reason = err.source.to_string();
                (
                    err.filename,
                    Err(tocmatch_core::ExtractionError::Unreadable { reason }),
                )
            }
        };
        if result.is_ok() {
            extracted += 1;
        }
        output::print_title_trace(&mut stdout, i, &filename, &result, color)?;
    }

    writeln!(
        stdout,
        "Total: {} PDFs ({} titles extracted, {} failed)",
        directory.len(),
        extracted,
        directory.len() - extracted
    )?;
    Ok(())
}
