//! # pdftriage
//!
//! PDF triage and table extraction for Rust.
//!
//! This library decides whether a PDF is text-native, scanned or mixed from
//! cheap structural signals, then extracts tabular rows with the strategy
//! that fits: native text and table detection, OCR over page rasters, or a
//! per-page hybrid of both.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use pdftriage::{extract_file, CategoryChoice, ExtractOptions, OcrEngine, RasterImage};
//!
//! fn main() -> pdftriage::Result<()> {
//!     // Any OCR backend can be plugged in as a closure
//!     let engine: Arc<dyn OcrEngine> =
//!         Arc::new(|_: &RasterImage, _: &str| -> pdftriage::Result<String> { Ok(String::new()) });
//!
//!     let result = extract_file(
//!         "statement.pdf",
//!         CategoryChoice::Computed,
//!         ExtractOptions::default(),
//!         engine,
//!     )?;
//!     println!("{} rows as {}", result.rows.len(), result.category);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Classification**: text density, image coverage and ruled-line grid signal per page
//! - **Strategies**: text tables, OCR, and hybrid with per-page OCR fallback
//! - **Page isolation**: a failing page becomes a warning, not a failed document
//! - **Parallel processing**: bounded, order-preserving page workers on Rayon

pub mod classify;
pub mod decode;
pub mod detect;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalize;
pub mod options;
pub mod probe;

mod pool;

// Re-export commonly used types
pub use classify::{aggregate, classify, classify_with_confidence, Classify, DocumentClassifier};
pub use decode::{decode_bytes, decode_document, decode_reader};
pub use detect::{is_pdf_bytes, sniff_pdf, PdfFormat};
pub use dispatch::{CategoryChoice, ExtractionDispatcher};
pub use error::{Error, Result};
pub use extract::{
    CancelToken, ColumnSplitter, EmbeddedImageRasterizer, Extractor, HybridExtractor, OcrEngine,
    OpticalExtractor, PageReport, RasterImage, Rasterizer, Strategy, TextTableExtractor,
};
pub use model::{
    CategoryDecision, Classification, Confidence, Document, DocumentCategory, ExtractedRow,
    ExtractionResult, LineSegment, Metadata, Page, PageImage, PageSignature, Provenance, Rect,
    TextSpan,
};
pub use options::{Aggregation, ColumnSplit, ExtractOptions};
pub use probe::PageStructureProbe;

use std::path::Path;
use std::sync::Arc;

/// Decode PDF bytes, classify them (unless overridden) and extract rows.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pdftriage::{extract_bytes, DocumentCategory, ExtractOptions, OcrEngine, RasterImage};
///
/// let engine: Arc<dyn OcrEngine> =
///     Arc::new(|_: &RasterImage, _: &str| -> pdftriage::Result<String> { Ok(String::new()) });
/// let data = std::fs::read("ledger.pdf").unwrap();
/// let result = extract_bytes(&data, DocumentCategory::TextNative, ExtractOptions::default(), engine)
///     .unwrap();
/// assert!(result.pages_failed.len() < result.page_count);
/// ```
pub fn extract_bytes(
    data: &[u8],
    choice: impl Into<CategoryChoice>,
    options: ExtractOptions,
    engine: Arc<dyn OcrEngine>,
) -> Result<ExtractionResult> {
    options.validate()?;
    let document = decode_bytes(data)?;
    ExtractionDispatcher::new(engine)
        .with_options(options)
        .run(&document, choice.into())
}

/// Read a PDF file and extract rows from it.
pub fn extract_file<P: AsRef<Path>>(
    path: P,
    choice: impl Into<CategoryChoice>,
    options: ExtractOptions,
    engine: Arc<dyn OcrEngine>,
) -> Result<ExtractionResult> {
    let data = std::fs::read(path)?;
    extract_bytes(&data, choice, options, engine)
}

/// Decode PDF bytes and classify the document without extracting.
pub fn classify_bytes(data: &[u8], options: &ExtractOptions) -> Result<Classification> {
    options.validate()?;
    let document = decode_bytes(data)?;
    if document.is_empty() {
        return Err(Error::EmptyDocument);
    }
    let probe = PageStructureProbe::new(options.min_line_length);
    let signatures = pool::map_bounded(document.pages(), options.max_page_concurrency, |page| {
        probe.measure(page)
    });
    classify_with_confidence(&signatures, options)
}
