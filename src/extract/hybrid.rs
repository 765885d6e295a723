//! Text pass with OCR fallback, for mixed documents.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{DocumentCategory, Page};
use crate::options::ExtractOptions;

use super::ocr::{OcrEngine, Rasterizer};
use super::optical::OpticalExtractor;
use super::text::TextTableExtractor;
use super::{Extractor, PageReport};

/// Runs the text pass on each page and falls back to OCR when it yields nothing.
#[derive(Debug, Clone)]
pub struct HybridExtractor {
    text: TextTableExtractor,
    optical: OpticalExtractor,
    concurrency: usize,
}

impl HybridExtractor {
    pub fn new(
        options: ExtractOptions,
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        Self {
            concurrency: options.max_page_concurrency,
            text: TextTableExtractor::new(options.clone()),
            optical: OpticalExtractor::new(options, engine, rasterizer),
        }
    }
}

impl Extractor for HybridExtractor {
    fn name(&self) -> &'static str {
        "HybridExtractor"
    }

    fn category(&self) -> DocumentCategory {
        DocumentCategory::Mixed
    }

    fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn extract_page(&self, page: &Page) -> Result<PageReport> {
        let text_reason = match self.text.extract_page(page) {
            Ok(report) if !report.rows.is_empty() => return Ok(report),
            Ok(report) => report
                .warnings
                .into_iter()
                .next()
                .unwrap_or_else(|| format!("page {}: text pass found no rows", page.index)),
            Err(e) => format!("page {}: text pass failed: {}", page.index, e),
        };

        log::debug!(
            "HybridExtractor: page {} falling back to OCR ({})",
            page.index,
            text_reason
        );

        match self.optical.ocr_page(page) {
            Ok(rows) if !rows.is_empty() => Ok(PageReport::new(rows).with_warning(format!(
                "page {}: no native rows, used OCR fallback",
                page.index
            ))),
            Ok(_) => Ok(PageReport::default()
                .with_warning(text_reason)
                .with_warning(format!("page {}: OCR found no rows", page.index))),
            Err(e) => Ok(PageReport::default()
                .with_warning(text_reason)
                .with_warning(format!("page {}: OCR fallback failed: {}", page.index, e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::Error;
    use crate::extract::{EmbeddedImageRasterizer, RasterImage};
    use crate::model::{Document, PageImage, Provenance, Rect, TextSpan};

    fn text_page(index: usize) -> Page {
        Page::letter(index)
            .with_span(TextSpan::new("Invoice number 1042", 72.0, 700.0, 12.0))
            .with_span(TextSpan::new("Customer Acme Corporation", 72.0, 680.0, 12.0))
    }

    fn scan_page(index: usize) -> Page {
        Page::letter(index).with_image(
            PageImage::placed(Rect::new(0.0, 0.0, 612.0, 792.0)).with_data(100, 100, vec![7]),
        )
    }

    #[test]
    fn test_text_rows_skip_ocr() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let engine: Arc<dyn OcrEngine> = Arc::new(move |_: &RasterImage, _: &str| -> Result<String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok("ocr".to_string())
        });
        let hybrid = HybridExtractor::new(
            ExtractOptions::default(),
            engine,
            Arc::new(EmbeddedImageRasterizer),
        );

        let report = hybrid.extract_page(&text_page(0)).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert!(report.rows.iter().all(|r| r.provenance == Provenance::FromText));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_falls_back_to_ocr_per_page() {
        let engine: Arc<dyn OcrEngine> = Arc::new(|_: &RasterImage, _: &str| -> Result<String> {
            Ok("Total    99".to_string())
        });
        let hybrid = HybridExtractor::new(
            ExtractOptions::default(),
            engine,
            Arc::new(EmbeddedImageRasterizer),
        );

        let document = Document::from_pages(vec![text_page(0), scan_page(1)]);
        let result = hybrid.extract(&document);

        assert_eq!(result.rows_for_page(0).count(), 2);
        let ocr_rows: Vec<_> = result.rows_for_page(1).collect();
        assert_eq!(ocr_rows.len(), 1);
        assert_eq!(ocr_rows[0].provenance, Provenance::FromOcr);
        assert_eq!(ocr_rows[0].texts(), vec!["Total", "99"]);
        assert!(result.pages_failed.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("OCR fallback")));
    }

    #[test]
    fn test_unmappable_glyphs_fall_back_to_ocr() {
        let engine: Arc<dyn OcrEngine> = Arc::new(|_: &RasterImage, _: &str| -> Result<String> {
            Ok("Total  99".to_string())
        });
        let hybrid = HybridExtractor::new(
            ExtractOptions::default(),
            engine,
            Arc::new(EmbeddedImageRasterizer),
        );

        let glyphs: String = ('\u{E001}'..='\u{E00A}').collect();
        let page = scan_page(0).with_span(TextSpan::new(glyphs, 72.0, 700.0, 24.0));
        let document = Document::from_pages(vec![page, text_page(1)]);
        let result = hybrid.extract(&document);

        let rows: Vec<_> = result.rows_for_page(0).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provenance, Provenance::FromOcr);
        assert_eq!(rows[0].texts(), vec!["Total", "99"]);
        assert_eq!(result.rows_for_page(1).count(), 2);
        assert!(result.pages_failed.is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("page 0: no native rows")));
    }

    #[test]
    fn test_both_passes_failing_records_both_reasons() {
        let engine: Arc<dyn OcrEngine> = Arc::new(|_: &RasterImage, _: &str| -> Result<String> {
            Err(Error::OcrEngine("engine offline".into()))
        });
        let hybrid = HybridExtractor::new(
            ExtractOptions::default(),
            engine,
            Arc::new(EmbeddedImageRasterizer),
        );

        let result = hybrid.extract(&Document::from_pages(vec![scan_page(0)]));
        assert!(result.pages_failed.contains(&0));
        assert!(result.warnings.iter().any(|w| w.contains("no native text")));
        assert!(result.warnings.iter().any(|w| w.contains("engine offline")));
    }
}
