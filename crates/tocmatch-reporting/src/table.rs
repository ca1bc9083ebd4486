//! The record table as a CSV file.
//!
//! Reading keeps every column and every cell as text so that writing the
//! table back only touches the `File Name` and `Match Confidence` columns.
//! Spacer rows with only empty cells are kept in place but carry no record.

use std::io::{Read, Write};
use std::path::Path;

use tocmatch_core::{BibliographicRecord, join_authors, split_authors};

use crate::ReportError;

pub const COL_VOLUME: &str = "Vol";
pub const COL_ISSUE: &str = "No";
pub const COL_YEAR: &str = "Year";
pub const COL_TITLE: &str = "Article";
pub const COL_AUTHORS: &str = "Author";
pub const COL_PAGES: &str = "Pages";
pub const COL_FILE_NAME: &str = "File Name";
pub const COL_CONFIDENCE: &str = "Match Confidence";

const RECORD_COLUMNS: [&str; 6] = [
    COL_VOLUME,
    COL_ISSUE,
    COL_YEAR,
    COL_TITLE,
    COL_AUTHORS,
    COL_PAGES,
];

#[derive(Debug, Clone, Copy)]
struct Columns {
    volume: usize,
    issue: usize,
    year: usize,
    title: usize,
    authors: usize,
    pages: usize,
    file_name: Option<usize>,
    confidence: Option<usize>,
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

impl Columns {
    fn locate(headers: &[String]) -> Result<Self, ReportError> {
        let required = |name: &'static str| {
            find_column(headers, name).ok_or(ReportError::MissingColumn(name))
        };
        Ok(Self {
            volume: required(COL_VOLUME)?,
            issue: required(COL_ISSUE)?,
            year: required(COL_YEAR)?,
            title: required(COL_TITLE)?,
            authors: required(COL_AUTHORS)?,
            pages: required(COL_PAGES)?,
            file_name: find_column(headers, COL_FILE_NAME),
            confidence: find_column(headers, COL_CONFIDENCE),
        })
    }
}

/// Parse a numeric cell, accepting spreadsheet-style `"3.0"`.
fn parse_number(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if let Ok(n) = cell.parse::<u32>() {
        return Some(n);
    }
    let f = cell.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64).then_some(f as u32)
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

/// A CSV record table with its original headers and cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    /// A fresh table with the six record columns.
    pub fn from_records(records: &[BibliographicRecord]) -> Self {
        let headers = RECORD_COLUMNS.iter().map(|c| c.to_string()).collect();
        let rows = records
            .iter()
            .map(|r| {
                vec![
                    r.volume.to_string(),
                    r.issue.to_string(),
                    r.year.map(|y| y.to_string()).unwrap_or_default(),
                    r.title.clone(),
                    join_authors(&r.authors),
                    r.pages.clone(),
                ]
            })
            .collect();
        Self { headers, rows }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ReportError> {
        let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        Columns::locate(&headers)?;

        let mut rows = Vec::new();
        for row in csv.records() {
            let row = row?;
            let mut cells: Vec<String> = row.iter().map(str::to_string).collect();
            cells.resize(cells.len().max(headers.len()), String::new());
            rows.push(cells);
        }
        tracing::debug!(rows = rows.len(), columns = headers.len(), "read record table");
        Ok(Self { headers, rows })
    }

    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let file = std::fs::File::open(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let mut csv = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        csv.write_record(&self.headers)?;
        for row in &self.rows {
            csv.write_record(row)?;
        }
        csv.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let file = std::fs::File::create(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.to_writer(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows that hold a record (spacer rows excluded).
    pub fn record_count(&self) -> usize {
        self.rows.iter().filter(|r| !is_blank_row(r)).count()
    }

    /// Convert every non-blank row to a record, in row order.
    ///
    /// A blank Year stays `None`. An existing `File Name` cell marks the
    /// record as already linked, so re-runs leave it alone.
    pub fn records(&self) -> Result<Vec<BibliographicRecord>, ReportError> {
        let cols = Columns::locate(&self.headers)?;
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| !is_blank_row(row))
            .map(|(i, row)| {
                // Header is line 1.
                let line = i + 2;
                let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
                let number = |idx: usize, column: &'static str| {
                    parse_number(cell(idx)).ok_or_else(|| ReportError::InvalidCell {
                        line,
                        column,
                        value: cell(idx).to_string(),
                    })
                };

                let year = match cell(cols.year).trim() {
                    "" => None,
                    _ => Some(number(cols.year, COL_YEAR)?),
                };
                let mut record = BibliographicRecord::new(
                    number(cols.volume, COL_VOLUME)?,
                    number(cols.issue, COL_ISSUE)?,
                    year,
                    cell(cols.title).trim(),
                )
                .with_authors(split_authors(cell(cols.authors)))
                .with_pages(cell(cols.pages).trim());

                if let Some(idx) = cols.file_name
                    && !cell(idx).trim().is_empty()
                {
                    record.matched_filename = Some(cell(idx).trim().to_string());
                    record.match_confidence = cols
                        .confidence
                        .and_then(|c| parse_number(cell(c).trim().trim_end_matches('%')))
                        .map(|n| n.min(100) as u8);
                }
                Ok(record)
            })
            .collect()
    }

    fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(idx) = find_column(&self.headers, name) {
            return idx;
        }
        self.headers.push(name.to_string());
        let width = self.headers.len();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, String::new());
            }
        }
        width - 1
    }

    /// Write each record's link into its row.
    ///
    /// `records` must be in row order (as returned by [`RecordTable::records`]).
    /// The two link columns are appended when missing and overwritten
    /// otherwise; no other cell changes. Spacer rows get blank link cells.
    pub fn apply_links(&mut self, records: &[BibliographicRecord]) -> Result<(), ReportError> {
        let rows = self.record_count();
        if records.len() != rows {
            return Err(ReportError::RowCountMismatch {
                rows,
                records: records.len(),
            });
        }
        let file_col = self.ensure_column(COL_FILE_NAME);
        let conf_col = self.ensure_column(COL_CONFIDENCE);
        let width = self.headers.len();

        let mut records = records.iter();
        for row in &mut self.rows {
            if is_blank_row(row) {
                row.resize(row.len().max(width), String::new());
                continue;
            }
            let Some(record) = records.next() else {
                break;
            };
            row.resize(row.len().max(width), String::new());
            row[file_col] = record.matched_filename.clone().unwrap_or_default();
            row[conf_col] = record
                .match_confidence
                .map(|c| c.to_string())
                .unwrap_or_default();
        }
        Ok(())
    }
}
