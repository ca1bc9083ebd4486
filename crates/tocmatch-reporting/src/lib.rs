use std::path::PathBuf;

use thiserror::Error;

pub mod export;
pub mod table;

pub use export::{ExportFormat, export_report, render_report};
pub use table::RecordTable;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record table has no {0:?} column")]
    MissingColumn(&'static str),
    #[error("line {line}: invalid {column} value {value:?}")]
    InvalidCell {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("table has {rows} rows but {records} records were given")]
    RowCountMismatch { rows: usize, records: usize },
    #[error("unknown report format {0:?} (expected json, csv or text)")]
    UnknownFormat(String),
}
