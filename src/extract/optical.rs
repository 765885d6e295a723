//! OCR-based extraction for scanned pages.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{DocumentCategory, ExtractedRow, Page, Provenance};
use crate::normalize;
use crate::options::ExtractOptions;

use super::ocr::{recognize_with_timeout, OcrEngine, OcrWorkers, Rasterizer};
use super::split::ColumnSplitter;
use super::{Extractor, PageReport};

/// Rasterizes each page and runs the OCR engine on it.
#[derive(Clone)]
pub struct OpticalExtractor {
    options: ExtractOptions,
    engine: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    splitter: ColumnSplitter,
    workers: OcrWorkers,
}

impl OpticalExtractor {
    /// Create an extractor.
    ///
    /// Options are expected to be validated; an invalid split pattern falls
    /// back to whitespace splitting.
    pub fn new(
        options: ExtractOptions,
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        let splitter = ColumnSplitter::new(&options.column_split).unwrap_or_else(|e| {
            log::warn!("OpticalExtractor: {}, using whitespace splitting", e);
            ColumnSplitter::default()
        });
        Self {
            workers: OcrWorkers::new(options.max_page_concurrency),
            options,
            engine,
            rasterizer,
            splitter,
        }
    }

    /// Recognize one page and split its text into rows.
    pub(crate) fn ocr_page(&self, page: &Page) -> Result<Vec<ExtractedRow>> {
        page.ensure_readable()?;

        let image = self.rasterizer.rasterize(page, self.options.dpi)?;
        log::debug!(
            "OpticalExtractor: page {} rasterized to {}x{} at {} dpi",
            page.index,
            image.width_px,
            image.height_px,
            image.dpi
        );

        let text = recognize_with_timeout(
            &self.engine,
            image,
            &self.options.language_hint,
            self.options.ocr_timeout_ms,
            &self.workers,
        )?;

        if text.trim().is_empty() {
            return Err(Error::OcrFailure {
                page: page.index,
                reason: "OCR returned no text".to_string(),
            });
        }

        let lines = self.splitter.split_text(&text);
        let rows = normalize::clean_page_rows(lines, page.index, Provenance::FromOcr);
        if rows.is_empty() {
            return Err(Error::OcrFailure {
                page: page.index,
                reason: "OCR text has no usable cells".to_string(),
            });
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for OpticalExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpticalExtractor")
            .field("options", &self.options)
            .field("splitter", &self.splitter)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl Extractor for OpticalExtractor {
    fn name(&self) -> &'static str {
        "OpticalExtractor"
    }

    fn category(&self) -> DocumentCategory {
        DocumentCategory::Scanned
    }

    fn concurrency(&self) -> usize {
        self.options.max_page_concurrency
    }

    fn extract_page(&self, page: &Page) -> Result<PageReport> {
        self.ocr_page(page).map(PageReport::new)
    }
}
