use std::fmt::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tocmatch_core::{
    Ambiguity, BibliographicRecord, LinkageReport, LinkageStats, PdfOutcome, PdfOutcomeKind,
    RecordId,
};

use crate::ReportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    Text,
}

impl ExportFormat {
    pub fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Json, ExportFormat::Csv, ExportFormat::Text]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Csv => "CSV",
            Self::Text => "Plain Text",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Text => "txt",
        }
    }
}

impl ExportFormat {
    /// The format whose extension `path` carries, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::all()
            .iter()
            .copied()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(ReportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Render the report for a finished run.
///
/// `records` is the record table after linking, used to show the titles
/// behind record ids and to list records no PDF claimed.
pub fn render_report(
    report: &LinkageReport,
    records: &[BibliographicRecord],
    format: ExportFormat,
) -> Result<String, ReportError> {
    match format {
        ExportFormat::Json => export_json(report, records),
        ExportFormat::Csv => export_csv(report, records),
        ExportFormat::Text => Ok(export_text(report, records)),
    }
}

/// Render and write the report to `path`.
pub fn export_report(
    report: &LinkageReport,
    records: &[BibliographicRecord],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ReportError> {
    let content = render_report(report, records, format)?;
    std::fs::write(path, content).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), format = format.label(), "wrote linkage report");
    Ok(())
}

fn record_title(records: &[BibliographicRecord], id: RecordId) -> &str {
    records.get(id.0).map(|r| r.title.as_str()).unwrap_or("")
}

fn unclaimed(
    records: &[BibliographicRecord],
) -> impl Iterator<Item = (RecordId, &BibliographicRecord)> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_claimed())
        .map(|(i, r)| (RecordId(i), r))
}

// =============================================================================
// JSON
// =============================================================================

#[derive(Serialize)]
struct JsonReport<'a> {
    threshold: u8,
    stats: &'a LinkageStats,
    outcomes: &'a [PdfOutcome],
    ambiguities: &'a [Ambiguity],
    unclaimed_records: Vec<JsonRecord<'a>>,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    record: RecordId,
    volume: u32,
    issue: u32,
    title: &'a str,
}

fn export_json(
    report: &LinkageReport,
    records: &[BibliographicRecord],
) -> Result<String, ReportError> {
    let doc = JsonReport {
        threshold: report.threshold,
        stats: &report.stats,
        outcomes: &report.outcomes,
        ambiguities: &report.ambiguities,
        unclaimed_records: unclaimed(records)
            .map(|(record, r)| JsonRecord {
                record,
                volume: r.volume,
                issue: r.issue,
                title: &r.title,
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

// =============================================================================
// CSV
// =============================================================================

const CSV_HEADER: [&str; 9] = [
    "File Name",
    "Outcome",
    "Extracted Title",
    "Record",
    "Vol",
    "No",
    "Article",
    "Score",
    "Detail",
];

fn export_csv(
    report: &LinkageReport,
    records: &[BibliographicRecord],
) -> Result<String, ReportError> {
    let mut csv = csv::Writer::from_writer(Vec::new());
    csv.write_record(CSV_HEADER)?;

    for outcome in &report.outcomes {
        let (label, record, score, detail) = match &outcome.kind {
            PdfOutcomeKind::Claimed {
                record,
                score,
                scorer,
                ..
            } => ("claimed", Some(*record), Some(*score), scorer.as_str().to_string()),
            PdfOutcomeKind::NoMatch { best, .. } => (
                "no_match",
                best.map(|(id, _)| id),
                best.map(|(_, s)| s),
                "below threshold".to_string(),
            ),
            PdfOutcomeKind::ExtractionFailed { error } => {
                ("extraction_failed", None, None, error.to_string())
            }
        };
        let rec = record.and_then(|id| records.get(id.0));
        let record_no = record.map(|id| id.0.to_string()).unwrap_or_default();
        let volume = rec.map(|r| r.volume.to_string()).unwrap_or_default();
        let issue = rec.map(|r| r.issue.to_string()).unwrap_or_default();
        let score = score.map(|s| s.to_string()).unwrap_or_default();
        csv.write_record([
            outcome.filename.as_str(),
            label,
            outcome.extracted_title().unwrap_or(""),
            record_no.as_str(),
            volume.as_str(),
            issue.as_str(),
            rec.map(|r| r.title.as_str()).unwrap_or(""),
            score.as_str(),
            detail.as_str(),
        ])?;
    }

    let bytes = csv
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// =============================================================================
// Plain text
// =============================================================================

fn describe_ambiguity(a: &Ambiguity, records: &[BibliographicRecord]) -> String {
    match a {
        Ambiguity::Tie {
            filename,
            records: ids,
            score,
        } => {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            format!("{filename}: tie at {score} between {}", ids.join(", "))
        }
        Ambiguity::Contested {
            filename,
            record,
            claimed_by,
            score,
        } => format!(
            "{filename}: {record} \"{}\" scores {score} but was already claimed by {claimed_by}",
            record_title(records, *record)
        ),
        Ambiguity::DuplicateTitles { records: ids } => {
            let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
            format!("duplicate titles: {}", ids.join(", "))
        }
    }
}

fn export_text(report: &LinkageReport, records: &[BibliographicRecord]) -> String {
    let s = &report.stats;
    let mut out = String::from("tocmatch linkage report\n");
    out.push_str(&"=".repeat(60));
    out.push('\n');
    let _ = writeln!(
        out,
        "  threshold {} | {} PDFs: {} claimed, {} unmatched, {} failed | {} of {} records linked\n",
        report.threshold,
        s.pdfs_total,
        s.pdfs_claimed,
        s.pdfs_unmatched,
        s.pdfs_extraction_failed,
        s.records_claimed,
        s.records_total,
    );

    let claimed: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match &o.kind {
            PdfOutcomeKind::Claimed {
                record,
                score,
                scorer,
                ..
            } => Some((o, *record, *score, *scorer)),
            _ => None,
        })
        .collect();
    if !claimed.is_empty() {
        out.push_str("Claimed\n-------\n");
        for (o, record, score, scorer) in claimed {
            let _ = writeln!(
                out,
                "  {} -> {} \"{}\" ({score}, {})",
                o.filename,
                record,
                record_title(records, record),
                scorer.as_str()
            );
        }
        out.push('\n');
    }

    let unmatched: Vec<_> = report.unmatched().collect();
    if !unmatched.is_empty() {
        out.push_str("No match\n--------\n");
        for o in unmatched {
            let title = o.extracted_title().unwrap_or("");
            match o.confidence() {
                Some(best) => {
                    let _ = writeln!(out, "  {}: \"{title}\" (best {best})", o.filename);
                }
                None => {
                    let _ = writeln!(out, "  {}: \"{title}\"", o.filename);
                }
            }
        }
        out.push('\n');
    }

    let failures: Vec<_> = report.extraction_failures().collect();
    if !failures.is_empty() {
        out.push_str("Extraction failed\n-----------------\n");
        for o in failures {
            if let PdfOutcomeKind::ExtractionFailed { error } = &o.kind {
                let _ = writeln!(out, "  {}: {error}", o.filename);
            }
        }
        out.push('\n');
    }

    if !report.ambiguities.is_empty() {
        out.push_str("Ambiguities\n-----------\n");
        for a in &report.ambiguities {
            let _ = writeln!(out, "  {}", describe_ambiguity(a, records));
        }
        out.push('\n');
    }

    let open: Vec<_> = unclaimed(records).collect();
    if !open.is_empty() {
        out.push_str("Unclaimed records\n-----------------\n");
        for (id, r) in open {
            let _ = writeln!(out, "  {id} Vol {} No {}: {}", r.volume, r.issue, r.title);
        }
    }
    out
}
