//! Extraction strategies.
//!
//! Each strategy turns one page into rows. The shared runner applies a
//! strategy to every page of a document, absorbs page failures into
//! warnings and keeps rows in page order regardless of concurrency.

mod hybrid;
mod ocr;
mod optical;
mod split;
mod table;
mod text;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Document, DocumentCategory, ExtractedRow, ExtractionResult, Page};
use crate::options::ExtractOptions;
use crate::pool;

pub use hybrid::HybridExtractor;
pub use ocr::{CancelToken, EmbeddedImageRasterizer, OcrEngine, RasterImage, Rasterizer};
pub use optical::OpticalExtractor;
pub use split::ColumnSplitter;
pub use table::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};
pub use text::TextTableExtractor;

/// Rows and notes produced for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageReport {
    pub rows: Vec<ExtractedRow>,
    pub warnings: Vec<String>,
}

impl PageReport {
    pub fn new(rows: Vec<ExtractedRow>) -> Self {
        Self {
            rows,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// A page-to-rows extraction strategy.
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Category this strategy serves.
    fn category(&self) -> DocumentCategory;

    /// Page concurrency limit for [`Extractor::extract`].
    fn concurrency(&self) -> usize {
        1
    }

    /// Extract rows from one page.
    ///
    /// An `Ok` report with no rows counts as a failed page.
    fn extract_page(&self, page: &Page) -> Result<PageReport>;

    /// Extract every page of `document`.
    fn extract(&self, document: &Document) -> ExtractionResult {
        run_pages(self, document)
    }
}

/// The closed set of strategies, one per category.
#[derive(Clone)]
pub enum Strategy {
    Text(TextTableExtractor),
    Optical(OpticalExtractor),
    Hybrid(HybridExtractor),
}

impl Strategy {
    /// Select the strategy for `category`.
    pub fn for_category(
        category: DocumentCategory,
        options: &ExtractOptions,
        engine: Arc<dyn OcrEngine>,
        rasterizer: Arc<dyn Rasterizer>,
    ) -> Self {
        match category {
            DocumentCategory::TextNative => Strategy::Text(TextTableExtractor::new(options.clone())),
            DocumentCategory::Scanned => {
                Strategy::Optical(OpticalExtractor::new(options.clone(), engine, rasterizer))
            }
            DocumentCategory::Mixed => {
                Strategy::Hybrid(HybridExtractor::new(options.clone(), engine, rasterizer))
            }
        }
    }

    fn inner(&self) -> &dyn Extractor {
        match self {
            Strategy::Text(e) => e,
            Strategy::Optical(e) => e,
            Strategy::Hybrid(e) => e,
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.name()).finish()
    }
}

impl Extractor for Strategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn category(&self) -> DocumentCategory {
        self.inner().category()
    }

    fn concurrency(&self) -> usize {
        self.inner().concurrency()
    }

    fn extract_page(&self, page: &Page) -> Result<PageReport> {
        self.inner().extract_page(page)
    }
}

/// Apply `extractor` to every page, absorbing page failures.
pub fn run_pages<E: Extractor + ?Sized>(extractor: &E, document: &Document) -> ExtractionResult {
    let outcomes = pool::map_bounded(document.pages(), extractor.concurrency(), |page| {
        match pool::catch_panic(|| extractor.extract_page(page)) {
            Ok(outcome) => outcome,
            Err(reason) => Err(Error::PagePanic {
                page: page.index,
                reason,
            }),
        }
    });

    let mut result = ExtractionResult::new(extractor.category(), document.page_count());
    for (page, outcome) in document.pages().iter().zip(outcomes) {
        match outcome {
            Ok(report) if !report.rows.is_empty() => {
                result.warnings.extend(report.warnings);
                result.rows.extend(report.rows);
            }
            Ok(report) if report.warnings.is_empty() => {
                let warning = format!("page {}: no rows extracted", page.index);
                log::warn!("{}: {}", extractor.name(), warning);
                result.fail_page(page.index, warning);
            }
            Ok(report) => {
                for warning in &report.warnings {
                    log::warn!("{}: {}", extractor.name(), warning);
                }
                result.pages_failed.insert(page.index);
                result.warnings.extend(report.warnings);
            }
            Err(e) => {
                let warning = format!("page {}: {}", page.index, e);
                log::warn!("{}: {}", extractor.name(), warning);
                result.fail_page(page.index, warning);
            }
        }
    }

    log::debug!(
        "{}: {} rows from {} pages ({} failed)",
        extractor.name(),
        result.rows.len(),
        result.page_count,
        result.pages_failed.len()
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;

    struct EchoIndex;

    impl Extractor for EchoIndex {
        fn name(&self) -> &'static str {
            "EchoIndex"
        }

        fn category(&self) -> DocumentCategory {
            DocumentCategory::TextNative
        }

        fn concurrency(&self) -> usize {
            4
        }

        fn extract_page(&self, page: &Page) -> Result<PageReport> {
            match page.index {
                1 => Err(Error::PageDecode {
                    page: 1,
                    reason: "bad stream".into(),
                }),
                2 => panic!("boom"),
                3 => Ok(PageReport::default().with_warning("page 3: blank")),
                i => Ok(PageReport::new(vec![ExtractedRow::from_texts(
                    [i.to_string()],
                    i,
                    Provenance::FromText,
                )])),
            }
        }
    }

    #[test]
    fn test_run_pages_absorbs_failures_in_order() {
        let document = Document::from_pages((0..6).map(Page::letter).collect());
        let result = EchoIndex.extract(&document);

        let pages: Vec<usize> = result.rows.iter().map(|r| r.page).collect();
        assert_eq!(pages, vec![0, 4, 5]);
        assert_eq!(result.pages_failed.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(result.warnings.iter().any(|w| w.contains("bad stream")));
        assert!(result.warnings.iter().any(|w| w.contains("boom")));
        assert!(result.warnings.iter().any(|w| w == "page 3: blank"));
    }

    #[test]
    fn test_strategy_for_category() {
        let options = ExtractOptions::default();
        let engine: Arc<dyn OcrEngine> =
            Arc::new(|_: &RasterImage, _: &str| -> Result<String> { Ok(String::new()) });
        let rasterizer: Arc<dyn Rasterizer> = Arc::new(EmbeddedImageRasterizer);

        let cases = [
            (DocumentCategory::TextNative, "TextTableExtractor"),
            (DocumentCategory::Scanned, "OpticalExtractor"),
            (DocumentCategory::Mixed, "HybridExtractor"),
        ];
        for (category, name) in cases {
            let strategy =
                Strategy::for_category(category, &options, engine.clone(), rasterizer.clone());
            assert_eq!(strategy.name(), name);
            assert_eq!(strategy.category(), category);
        }
    }
}
