use std::path::{Path, PathBuf};

use thiserror::Error;

use tocmatch_core::{DocumentError, PdfBackend, PdfDocument};

/// Default number of leading pages read from each PDF.
pub const DEFAULT_MAX_PAGES: usize = 2;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of tocmatch-ingest)")]
    NoPdfSupport,
}

/// The PDFs of one directory, in processing order.
///
/// Only regular files directly inside the directory whose extension is
/// `pdf` (any case) are listed. Files are ordered by name so that repeated
/// runs process them identically on every filesystem.
#[derive(Debug, Clone)]
pub struct PdfDirectory {
    root: PathBuf,
    files: Vec<PathBuf>,
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl PdfDirectory {
    pub fn scan(root: impl AsRef<Path>) -> Result<Self, IngestError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(IngestError::NotADirectory(root));
        }
        let io_err = |source| IngestError::Io {
            path: root.clone(),
            source,
        };

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();
            if path.is_file() && is_pdf(&path) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        tracing::debug!(dir = %root.display(), pdfs = files.len(), "scanned PDF directory");
        Ok(Self { root, files })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Lazily load every PDF through `backend`.
    ///
    /// Each file is opened, read and released when the iterator reaches it,
    /// so at most one document is open at a time. A file that cannot be
    /// read yields an `Err` and iteration continues with the next one.
    pub fn documents<'a, B>(
        &'a self,
        backend: &'a B,
        max_pages: usize,
    ) -> impl Iterator<Item = Result<PdfDocument, DocumentError>> + 'a
    where
        B: PdfBackend + ?Sized,
    {
        self.files
            .iter()
            .map(move |path| load_document(path, backend, max_pages))
    }
}

/// Read the first `max_pages` pages of one PDF.
pub fn load_document<B>(
    path: &Path,
    backend: &B,
    max_pages: usize,
) -> Result<PdfDocument, DocumentError>
where
    B: PdfBackend + ?Sized,
{
    let filename = file_name(path);
    match backend.extract_pages(path, max_pages) {
        Ok(pages) => Ok(PdfDocument::new(filename, pages)),
        Err(source) => {
            tracing::warn!(file = %filename, error = %source, "could not read PDF");
            Err(DocumentError { filename, source })
        }
    }
}

/// The MuPDF text backend.
#[cfg(feature = "pdf")]
pub fn default_backend() -> Result<Box<dyn PdfBackend>, IngestError> {
    Ok(Box::new(tocmatch_pdf_mupdf::MupdfBackend::new()))
}

#[cfg(not(feature = "pdf"))]
pub fn default_backend() -> Result<Box<dyn PdfBackend>, IngestError> {
    Err(IngestError::NoPdfSupport)
}
