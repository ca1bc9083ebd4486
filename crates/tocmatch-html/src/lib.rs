//! Bibliographic records from a directory of journal issue TOC pages.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tocmatch_core::BibliographicRecord;

pub mod markdown;
pub mod page;

pub use markdown::render_markdown;
pub use page::{IssueLabel, IssuePage, TocArticle, parse_issue_label, parse_issue_page};

#[derive(Error, Debug)]
pub enum HtmlError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn is_html(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("htm") || e.eq_ignore_ascii_case("html"))
}

/// `*.htm` / `*.html` files directly under `dir`, sorted by file name.
pub fn list_html_files(dir: &Path) -> Result<Vec<PathBuf>, HtmlError> {
    if !dir.is_dir() {
        return Err(HtmlError::NotADirectory(dir.to_path_buf()));
    }
    let entries = std::fs::read_dir(dir).map_err(|source| HtmlError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_html(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Read and parse one issue page.
pub fn load_issue_page(path: &Path) -> Result<IssuePage, HtmlError> {
    let html = std::fs::read_to_string(path).map_err(|source| HtmlError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_issue_page(&html))
}

/// Parse every issue page in `dir`, ordered by (year, volume, issue).
///
/// Files that cannot be read, or whose issue label cannot be parsed, are
/// logged and skipped.
pub fn load_directory(dir: &Path) -> Result<Vec<IssuePage>, HtmlError> {
    let mut pages = Vec::new();

    for path in list_html_files(dir)? {
        let page = match load_issue_page(&path) {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping issue page");
                continue;
            }
        };
        if page.label.is_none() {
            tracing::warn!(
                file = %path.display(),
                heading = %page.heading,
                "could not parse issue label, skipping"
            );
            continue;
        }
        tracing::debug!(
            file = %path.display(),
            heading = %page.heading,
            articles = page.articles.len(),
            "parsed issue page"
        );
        pages.push(page);
    }

    pages.sort_by_key(|p| p.label.map(|l| (l.year, l.volume, l.issue)));
    Ok(pages)
}

/// Build the record table for every issue page in `dir`.
///
/// Pages are loaded as in [`load_directory`]; the result is grouped by
/// year (see [`apply_year_grouping`]).
pub fn extract_directory(dir: &Path) -> Result<Vec<BibliographicRecord>, HtmlError> {
    Ok(records_from_pages(&load_directory(dir)?))
}

/// Year-grouped records for already parsed pages. Pages without an issue
/// label contribute nothing.
pub fn records_from_pages(pages: &[IssuePage]) -> Vec<BibliographicRecord> {
    let mut records: Vec<BibliographicRecord> = pages
        .iter()
        .filter_map(IssuePage::records)
        .flatten()
        .collect();
    apply_year_grouping(&mut records);
    records
}

/// Sort by (year, volume, issue) and keep the year only on the first row
/// of each year group.
///
/// The sort is stable, so articles keep their page order within an issue.
/// Rows with no year sort last.
pub fn apply_year_grouping(records: &mut [BibliographicRecord]) {
    records.sort_by_key(|r| (r.year.is_none(), r.year, r.volume, r.issue));

    let mut previous = None;
    for record in records.iter_mut() {
        if record.year.is_none() {
            continue;
        }
        if record.year == previous {
            record.year = None;
        } else {
            previous = record.year;
        }
    }
}
