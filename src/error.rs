//! Error types for pdftriage.

use std::io;
use thiserror::Error;

use crate::model::ExtractionResult;

/// Result type alias for pdftriage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while classifying and extracting a PDF.
///
/// Page-level variants (`PageDecode`, `OcrFailure`, `OcrTimeout`, `PagePanic`) are absorbed
/// by the extractors and surface as warnings; only the document-level
/// variants reach the caller of [`crate::ExtractionDispatcher::run`].
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading input.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is not recognized as PDF.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The PDF version is not supported.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted.
    #[error("Document is encrypted")]
    Encrypted,

    /// The document has no pages.
    #[error("Document has no pages")]
    EmptyDocument,

    /// One page could not be decoded.
    #[error("Page {page} could not be decoded: {reason}")]
    PageDecode { page: usize, reason: String },

    /// The OCR capability failed for a page.
    #[error("OCR failed on page {page}: {reason}")]
    OcrFailure { page: usize, reason: String },

    /// The OCR capability did not answer in time.
    #[error("OCR timed out on page {page} after {timeout_ms} ms")]
    OcrTimeout { page: usize, timeout_ms: u64 },

    /// An extractor panicked while processing a page.
    #[error("Extraction panicked on page {page}: {reason}")]
    PagePanic { page: usize, reason: String },

    /// Error reported by an OCR engine implementation.
    #[error("OCR engine error: {0}")]
    OcrEngine(String),

    /// A page could not be turned into a raster image.
    #[error("Rasterization error: {0}")]
    Rasterize(String),

    /// Every page of the document failed; the partial result is attached.
    #[error("No usable data: all {} pages failed", .0.page_count)]
    AllPagesFailed(Box<ExtractionResult>),

    /// An option is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration JSON could not be read.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is confined to a single page.
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            Error::PageDecode { .. }
                | Error::OcrFailure { .. }
                | Error::OcrTimeout { .. }
                | Error::PagePanic { .. }
        )
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}
