use std::io::Write;

use owo_colors::OwoColorize;
use tocmatch_core::{
    Ambiguity, BibliographicRecord, ExtractionError, LinkageReport, PdfOutcome, PdfOutcomeKind,
};
use tocmatch_parsing::TitleTrace;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

fn print_header(w: &mut dyn Write, title: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())?;
        writeln!(w, "{}", title.bold())?;
        writeln!(w, "{}", sep.bold())?;
    } else {
        writeln!(w, "{sep}")?;
        writeln!(w, "{title}")?;
        writeln!(w, "{sep}")?;
    }
    Ok(())
}

/// One line per finished PDF, printed above the progress bar with `-v`.
pub fn outcome_line(
    outcome: &PdfOutcome,
    records: &[BibliographicRecord],
    color: ColorMode,
) -> String {
    match &outcome.kind {
        PdfOutcomeKind::Claimed { record, score, .. } => {
            let title = records
                .get(record.0)
                .map(|r| truncate(&r.title, 50))
                .unwrap_or_default();
            if color.enabled() {
                format!(
                    "{} -> {} \"{}\" ({})",
                    outcome.filename,
                    "MATCHED".green(),
                    title,
                    score
                )
            } else {
                format!("{} -> MATCHED \"{}\" ({})", outcome.filename, title, score)
            }
        }
        PdfOutcomeKind::NoMatch { title, best } => {
            let best = best.map(|(_, s)| format!(", best {s}")).unwrap_or_default();
            let title = truncate(title, 50);
            if color.enabled() {
                format!(
                    "{} -> {} \"{}\"{}",
                    outcome.filename,
                    "NO MATCH".yellow(),
                    title,
                    best
                )
            } else {
                format!("{} -> NO MATCH \"{}\"{}", outcome.filename, title, best)
            }
        }
        PdfOutcomeKind::ExtractionFailed { error } => {
            if color.enabled() {
                format!("{} -> {} ({})", outcome.filename, "FAILED".red(), error)
            } else {
                format!("{} -> FAILED ({})", outcome.filename, error)
            }
        }
    }
}

/// Print the end-of-run summary for `tocmatch link`.
pub fn print_link_summary(
    w: &mut dyn Write,
    report: &LinkageReport,
    records: &[BibliographicRecord],
    color: ColorMode,
) -> std::io::Result<()> {
    let s = &report.stats;

    let failures: Vec<_> = report.extraction_failures().collect();
    if !failures.is_empty() {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "Title extraction failed:".red().bold())?;
        } else {
            writeln!(w, "Title extraction failed:")?;
        }
        for o in failures {
            if let PdfOutcomeKind::ExtractionFailed { error } = &o.kind {
                writeln!(w, "  {} ({})", o.filename, error)?;
            }
        }
    }

    let unmatched: Vec<_> = report.unmatched().collect();
    if !unmatched.is_empty() {
        writeln!(w)?;
        if color.enabled() {
            writeln!(w, "{}", "No confident match:".yellow().bold())?;
        } else {
            writeln!(w, "No confident match:")?;
        }
        for o in unmatched {
            let title = o.extracted_title().map(|t| truncate(t, 60)).unwrap_or_default();
            match o.confidence() {
                Some(best) => writeln!(w, "  {} \"{}\" (best {})", o.filename, title, best)?,
                None => writeln!(w, "  {} \"{}\"", o.filename, title)?,
            }
        }
    }

    let contested: Vec<_> = report
        .ambiguities
        .iter()
        .filter(|a| !matches!(a, Ambiguity::DuplicateTitles { .. }))
        .collect();
    if !contested.is_empty() {
        writeln!(w)?;
        let msg = format!(
            "{} ambiguous decision(s); see the report for details",
            contested.len()
        );
        if color.enabled() {
            writeln!(w, "{}", msg.dimmed())?;
        } else {
            writeln!(w, "{msg}")?;
        }
    }

    writeln!(w)?;
    print_header(w, "SUMMARY", color)?;
    writeln!(w, "  Threshold: {}", report.threshold)?;
    writeln!(w, "  PDF files: {}", s.pdfs_total)?;
    writeln!(w, "  Records:   {}", s.records_total)?;
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Matched:".green(), s.pdfs_claimed)?;
    } else {
        writeln!(w, "  Matched: {}", s.pdfs_claimed)?;
    }
    if s.pdfs_unmatched > 0 {
        if color.enabled() {
            writeln!(w, "  {} {}", "No match:".yellow(), s.pdfs_unmatched)?;
        } else {
            writeln!(w, "  No match: {}", s.pdfs_unmatched)?;
        }
    }
    if s.pdfs_extraction_failed > 0 {
        if color.enabled() {
            writeln!(
                w,
                "  {} {}",
                "Extraction failed:".red(),
                s.pdfs_extraction_failed
            )?;
        } else {
            writeln!(w, "  Extraction failed: {}", s.pdfs_extraction_failed)?;
        }
    }
    let rate = if records.is_empty() {
        0.0
    } else {
        s.records_claimed as f64 / records.len() as f64 * 100.0
    };
    writeln!(
        w,
        "  Records linked: {}/{} ({:.1}%)",
        s.records_claimed, s.records_total, rate
    )?;
    writeln!(w)?;
    Ok(())
}

/// Print one PDF's result for `tocmatch titles`.
pub fn print_title_trace(
    w: &mut dyn Write,
    index: usize,
    filename: &str,
    result: &Result<TitleTrace, ExtractionError>,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} {}",
            format!("[{}]", index + 1).bold().yellow(),
            filename.bold()
        )?;
    } else {
        writeln!(w, "[{}] {}", index + 1, filename)?;
    }
    match result {
        Ok(trace) => {
            writeln!(w, "  Title:   {}", trace.title)?;
            if let Some(marker) = &trace.marker {
                writeln!(w, "  Marker:  {marker}")?;
            }
            for (line, kind) in &trace.skipped {
                let msg = format!("  Skipped: {} ({kind})", truncate(line, 60));
                if color.enabled() {
                    writeln!(w, "{}", msg.dimmed())?;
                } else {
                    writeln!(w, "{msg}")?;
                }
            }
            if trace.used_fallback {
                writeln!(w, "  (longest-line fallback)")?;
            }
        }
        Err(error) => {
            if color.enabled() {
                writeln!(w, "  {}", format!("FAILED: {error}").red())?;
            } else {
                writeln!(w, "  FAILED: {error}")?;
            }
        }
    }
    writeln!(w)
}
