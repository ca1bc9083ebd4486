//! Directory scanning and lazy loading with an in-memory backend.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use tocmatch_core::{BackendError, PdfBackend};
use tocmatch_ingest::{IngestError, PdfDirectory};

/// Serves page text by file name and records every file it was asked for.
struct StaticBackend {
    pages: HashMap<String, Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl StaticBackend {
    fn new(entries: &[(&str, &[&str])]) -> Self {
        Self {
            pages: entries
                .iter()
                .map(|(name, pages)| {
                    (name.to_string(), pages.iter().map(|p| p.to_string()).collect())
                })
                .collect(),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl PdfBackend for StaticBackend {
    fn extract_pages(&self, path: &Path, max_pages: usize) -> Result<Vec<String>, BackendError> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.opened.lock().unwrap().push(name.clone());
        match self.pages.get(&name) {
            Some(pages) => Ok(pages.iter().take(max_pages).cloned().collect()),
            None => Err(BackendError::OpenError(format!("{name}: not a PDF"))),
        }
    }
}

fn fixture_dir(names: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for name in names {
        std::fs::write(dir.path().join(name), b"%PDF-1.4").unwrap();
    }
    dir
}

#[test]
fn test_lists_only_pdfs_sorted() {
    let dir = fixture_dir(&["b.pdf", "A.PDF", "notes.txt", "c.pdf"]);
    std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

    let listing = PdfDirectory::scan(dir.path()).unwrap();
    let names: Vec<String> = listing
        .files()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["A.PDF", "b.pdf", "c.pdf"]);
    assert_eq!(listing.len(), 3);
}

#[test]
fn test_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        PdfDirectory::scan(&missing),
        Err(IngestError::NotADirectory(_))
    ));
}

#[test]
fn test_documents_are_loaded_lazily_in_order() {
    let dir = fixture_dir(&["1.pdf", "2.pdf", "3.pdf"]);
    let backend = StaticBackend::new(&[
        ("1.pdf", &["one", "one b", "one c"][..]),
        ("2.pdf", &["two"][..]),
        ("3.pdf", &["three"][..]),
    ]);
    let listing = PdfDirectory::scan(dir.path()).unwrap();

    let mut docs = listing.documents(&backend, 2);
    assert!(backend.opened().is_empty());

    let first = docs.next().unwrap().unwrap();
    assert_eq!(first.filename, "1.pdf");
    assert_eq!(first.pages, vec!["one", "one b"]);
    assert_eq!(backend.opened(), vec!["1.pdf"]);

    let rest: Vec<_> = docs.collect();
    assert_eq!(rest.len(), 2);
    assert_eq!(backend.opened(), vec!["1.pdf", "2.pdf", "3.pdf"]);
}

#[test]
fn test_unreadable_file_does_not_stop_iteration() {
    let dir = fixture_dir(&["bad.pdf", "good.pdf"]);
    let backend = StaticBackend::new(&[("good.pdf", &["Energy Saving Trends"][..])]);
    let listing = PdfDirectory::scan(dir.path()).unwrap();

    let results: Vec<_> = listing.documents(&backend, 2).collect();
    assert_eq!(results.len(), 2);
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.filename, "bad.pdf");
    assert!(matches!(err.source, BackendError::OpenError(_)));
    assert_eq!(results[1].as_ref().unwrap().filename, "good.pdf");
}

#[test]
fn test_trait_object_backend() {
    let dir = fixture_dir(&["x.pdf"]);
    let backend: Box<dyn PdfBackend> = Box::new(StaticBackend::new(&[("x.pdf", &["X"][..])]));
    let listing = PdfDirectory::scan(dir.path()).unwrap();
    let docs: Vec<_> = listing.documents(backend.as_ref(), 1).collect();
    assert_eq!(docs[0].as_ref().unwrap().pages, vec!["X"]);
}
