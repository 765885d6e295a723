//! Classification and strategy dispatch for one document.

use std::sync::Arc;

use crate::classify::{Classify, DocumentClassifier};
use crate::error::{Error, Result};
use crate::extract::{EmbeddedImageRasterizer, Extractor, OcrEngine, Rasterizer, Strategy};
use crate::model::{CategoryDecision, Document, DocumentCategory, ExtractionResult, PageSignature};
use crate::normalize;
use crate::options::ExtractOptions;
use crate::pool;
use crate::probe::PageStructureProbe;

/// How the category of a run is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryChoice {
    /// Use this category; the classifier is not consulted.
    Override(DocumentCategory),
    /// Measure the pages and classify.
    #[default]
    Computed,
}

impl From<Option<DocumentCategory>> for CategoryChoice {
    fn from(category: Option<DocumentCategory>) -> Self {
        match category {
            Some(c) => CategoryChoice::Override(c),
            None => CategoryChoice::Computed,
        }
    }
}

impl From<DocumentCategory> for CategoryChoice {
    fn from(category: DocumentCategory) -> Self {
        CategoryChoice::Override(category)
    }
}

/// Routes a document to the extraction strategy for its category.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use pdftriage::{CategoryChoice, Document, ExtractionDispatcher, OcrEngine, Page, RasterImage, TextSpan};
///
/// let engine: Arc<dyn OcrEngine> =
///     Arc::new(|_: &RasterImage, _: &str| -> pdftriage::Result<String> { Ok(String::new()) });
/// let dispatcher = ExtractionDispatcher::new(engine);
///
/// let page = Page::letter(0).with_span(TextSpan::new("Hello from page one", 72.0, 700.0, 24.0));
/// let document = Document::from_pages(vec![page]);
/// let result = dispatcher.run(&document, CategoryChoice::Computed).unwrap();
/// assert_eq!(result.rows[0].texts(), vec!["Hello from page one"]);
/// ```
pub struct ExtractionDispatcher {
    options: ExtractOptions,
    engine: Arc<dyn OcrEngine>,
    rasterizer: Arc<dyn Rasterizer>,
    classifier: Box<dyn Classify>,
}

impl ExtractionDispatcher {
    /// Create a dispatcher with default options.
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self {
            options: ExtractOptions::default(),
            engine,
            rasterizer: Arc::new(EmbeddedImageRasterizer),
            classifier: Box::new(DocumentClassifier::new()),
        }
    }

    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classify>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Measure every page of `document`.
    pub fn measure(&self, document: &Document) -> Vec<PageSignature> {
        let probe = PageStructureProbe::new(self.options.min_line_length);
        pool::map_bounded(document.pages(), self.options.max_page_concurrency, |page| {
            probe.measure(page)
        })
    }

    /// Select the category, extract and normalize.
    ///
    /// Page failures are recorded in the result. Fails with
    /// [`Error::EmptyDocument`] for a document without pages and with
    /// [`Error::AllPagesFailed`] when no page produced data.
    pub fn run(&self, document: &Document, choice: CategoryChoice) -> Result<ExtractionResult> {
        self.options.validate()?;

        if document.is_empty() {
            return Err(Error::EmptyDocument);
        }

        let (category, decision) = match choice {
            CategoryChoice::Override(category) => {
                log::info!("Using caller-supplied category: {}", category);
                (category, CategoryDecision::Overridden)
            }
            CategoryChoice::Computed => {
                let signatures = self.measure(document);
                let classification = self.classifier.classify(&signatures, &self.options)?;
                log::info!(
                    "Classified {} pages as {} ({:?} confidence)",
                    classification.pages,
                    classification.category,
                    classification.confidence
                );
                (
                    classification.category,
                    CategoryDecision::Computed(classification),
                )
            }
        };

        let strategy = Strategy::for_category(
            category,
            &self.options,
            Arc::clone(&self.engine),
            Arc::clone(&self.rasterizer),
        );
        log::info!(
            "Extracting {} pages with {}",
            document.page_count(),
            strategy.name()
        );

        let mut result = strategy.extract(document);
        result.category = category;
        result.decision = decision;
        normalize::normalize(&mut result);

        fail_empty_pages(&mut result);

        if result.all_failed() {
            return Err(Error::AllPagesFailed(Box::new(result)));
        }

        if result.is_partial() {
            log::warn!(
                "{} of {} pages produced no data",
                result.pages_failed.len(),
                result.page_count
            );
        }

        Ok(result)
    }
}

/// Mark every page left without rows as failed.
fn fail_empty_pages(result: &mut ExtractionResult) {
    for page in 0..result.page_count {
        if !result.pages_failed.contains(&page) && result.rows_for_page(page).next().is_none() {
            log::warn!("page {}: no rows left after normalization", page);
            result.fail_page(page, format!("page {page}: no rows left after normalization"));
        }
    }
}

impl std::fmt::Debug for ExtractionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionDispatcher")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::RasterImage;
    use crate::model::{ExtractedRow, Page, Provenance, TextSpan};

    fn silent_engine() -> Arc<dyn OcrEngine> {
        Arc::new(|_: &RasterImage, _: &str| -> Result<String> { Ok(String::new()) })
    }

    #[test]
    fn test_choice_from_option() {
        assert_eq!(
            CategoryChoice::from(Some(DocumentCategory::Scanned)),
            CategoryChoice::Override(DocumentCategory::Scanned)
        );
        assert_eq!(CategoryChoice::from(None), CategoryChoice::Computed);
    }

    #[test]
    fn test_empty_document() {
        let dispatcher = ExtractionDispatcher::new(silent_engine());
        let result = dispatcher.run(&Document::default(), CategoryChoice::Computed);
        assert!(matches!(result, Err(Error::EmptyDocument)));

        let result = dispatcher.run(
            &Document::default(),
            CategoryChoice::Override(DocumentCategory::TextNative),
        );
        assert!(matches!(result, Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let dispatcher = ExtractionDispatcher::new(silent_engine())
            .with_options(ExtractOptions::default().with_dpi(0));
        let document = Document::from_pages(vec![Page::letter(0)]);
        let result = dispatcher.run(&document, CategoryChoice::Computed);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_all_pages_failed_carries_result() {
        let dispatcher = ExtractionDispatcher::new(silent_engine());
        let document = Document::from_pages(vec![Page::letter(0), Page::letter(1)]);
        match dispatcher.run(&document, CategoryChoice::Override(DocumentCategory::TextNative)) {
            Err(Error::AllPagesFailed(result)) => {
                assert_eq!(result.pages_failed.len(), 2);
                assert_eq!(result.warnings.len(), 2);
                assert_eq!(result.decision, CategoryDecision::Overridden);
            }
            other => panic!("expected AllPagesFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_pages_without_rows_are_failed() {
        let mut result = ExtractionResult::new(DocumentCategory::Scanned, 3);
        result.rows.push(ExtractedRow::from_texts(["Bolt"], 0, Provenance::FromOcr));
        result.rows.push(ExtractedRow::from_texts(["None"], 1, Provenance::FromOcr));
        result.rows.push(ExtractedRow::from_texts(["Nut"], 2, Provenance::FromOcr));
        result.fail_page(2, "page 2: earlier failure");

        normalize::normalize(&mut result);
        fail_empty_pages(&mut result);

        assert_eq!(result.pages_failed.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(
            result.warnings,
            vec![
                "page 2: earlier failure".to_string(),
                "page 1: no rows left after normalization".to_string(),
            ]
        );
    }

    #[test]
    fn test_computed_decision_is_recorded() {
        let dispatcher = ExtractionDispatcher::new(silent_engine());
        let page = Page::new(0, 200.0, 100.0)
            .with_span(TextSpan::new("A dense line of native text", 5.0, 50.0, 14.0))
            .with_span(TextSpan::new("and another one under it", 5.0, 30.0, 14.0));
        let result = dispatcher
            .run(&Document::from_pages(vec![page]), CategoryChoice::Computed)
            .unwrap();

        assert_eq!(result.category, DocumentCategory::TextNative);
        match result.decision {
            CategoryDecision::Computed(c) => assert_eq!(c.pages, 1),
            CategoryDecision::Overridden => panic!("expected computed decision"),
        }
    }
}
