//! Native text and table extraction.

use crate::error::Result;
use crate::model::{DocumentCategory, Page, Provenance, TextSpan};
use crate::normalize;
use crate::options::ExtractOptions;
use crate::probe::PageStructureProbe;

use super::table::TableDetector;
use super::{Extractor, PageReport};

/// Horizontal gap, as a multiple of the font size, that starts a new cell.
const CELL_GAP_FACTOR: f32 = 1.0;
/// Horizontal gap, as a multiple of the font size, that separates words.
const WORD_GAP_FACTOR: f32 = 0.15;

/// Extracts rows from a page's native text layer; never runs OCR.
#[derive(Debug, Clone)]
pub struct TextTableExtractor {
    options: ExtractOptions,
    probe: PageStructureProbe,
    detector: TableDetector,
}

impl TextTableExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            probe: PageStructureProbe::new(options.min_line_length),
            detector: TableDetector::new(),
            options,
        }
    }

    /// Use a custom table detector.
    pub fn with_detector(mut self, detector: TableDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Plain lines of spans, each split into cells at wide gaps.
    fn line_rows(&self, spans: &[TextSpan], indices: &[usize]) -> Vec<(f32, Vec<String>)> {
        self.detector
            .group_into_rows(spans, indices)
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> = Vec::new();
                let mut current = String::new();
                let mut prev_end: Option<f32> = None;

                for &i in &row.spans {
                    let span = &spans[i];
                    let text = span.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    if let Some(end) = prev_end {
                        let gap = span.x - end;
                        if gap > span.font_size * CELL_GAP_FACTOR {
                            cells.push(std::mem::take(&mut current));
                        } else if gap > span.font_size * WORD_GAP_FACTOR && !current.is_empty() {
                            current.push(' ');
                        }
                    }
                    current.push_str(text);
                    prev_end = Some(span.x + span.width);
                }
                if !current.is_empty() {
                    cells.push(current);
                }

                (row.y, cells)
            })
            .filter(|(_, cells)| !cells.is_empty())
            .collect()
    }
}

impl Default for TextTableExtractor {
    fn default() -> Self {
        Self::new(ExtractOptions::default())
    }
}

impl Extractor for TextTableExtractor {
    fn name(&self) -> &'static str {
        "TextTableExtractor"
    }

    fn category(&self) -> DocumentCategory {
        DocumentCategory::TextNative
    }

    fn concurrency(&self) -> usize {
        self.options.max_page_concurrency
    }

    fn extract_page(&self, page: &Page) -> Result<PageReport> {
        page.ensure_readable()?;

        let density = self.probe.measure(page).text_density;
        if density < self.options.min_text_density {
            return Ok(PageReport::default().with_warning(format!(
                "page {}: no native text (density {:.4})",
                page.index, density
            )));
        }

        let (tables, remaining) = self.detector.detect(&page.spans, &page.segments);
        log::debug!(
            "TextTableExtractor: page {} has {} tables, {} loose spans",
            page.index,
            tables.len(),
            remaining.len()
        );

        let mut lines: Vec<(f32, Vec<String>)> = tables
            .iter()
            .flat_map(|t| self.detector.table_cells(&page.spans, t))
            .collect();
        lines.extend(self.line_rows(&page.spans, &remaining));

        // Reading order: top of the page (largest y) first
        lines.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let rows = normalize::clean_page_rows(
            lines.into_iter().map(|(_, cells)| cells),
            page.index,
            Provenance::FromText,
        );
        if rows.is_empty() {
            return Ok(PageReport::default().with_warning(format!(
                "page {}: native text has no usable cells",
                page.index
            )));
        }

        Ok(PageReport::new(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::Document;

    fn span(text: &str, x: f32, y: f32) -> TextSpan {
        TextSpan::new(text, x, y, 12.0)
    }

    fn table_page(index: usize) -> Page {
        Page::letter(index)
            .with_span(span("Quarterly Report", 72.0, 740.0))
            .with_span(span("Region", 72.0, 700.0))
            .with_span(span("Sales", 250.0, 700.0))
            .with_span(span("North", 72.0, 685.0))
            .with_span(span("1200", 250.0, 685.0))
            .with_span(span("South", 72.0, 670.0))
            .with_span(span("950", 250.0, 670.0))
            .with_span(span("Prepared by finance", 72.0, 600.0))
    }

    #[test]
    fn test_table_and_lines_in_reading_order() {
        let extractor = TextTableExtractor::default();
        let report = extractor.extract_page(&table_page(0)).unwrap();
        let texts: Vec<Vec<&str>> = report.rows.iter().map(|r| r.texts()).collect();

        assert_eq!(texts.first().unwrap(), &vec!["Quarterly Report"]);
        assert!(texts.contains(&vec!["Region", "Sales"]));
        assert!(texts.contains(&vec!["North", "1200"]));
        assert_eq!(texts.last().unwrap(), &vec!["Prepared by finance"]);
        assert!(report.rows.iter().all(|r| r.provenance == Provenance::FromText));
    }

    #[test]
    fn test_line_cells_split_on_wide_gaps() {
        let extractor = TextTableExtractor::default();
        let page = Page::new(0, 400.0, 600.0)
            .with_span(span("Total", 72.0, 500.0).with_width(30.0))
            .with_span(span("due", 105.0, 500.0).with_width(18.0))
            .with_span(span("$40.00", 300.0, 500.0));
        let report = extractor.extract_page(&page).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].texts(), vec!["Total due", "$40.00"]);
    }

    #[test]
    fn test_textless_page_fails_with_warning() {
        let extractor = TextTableExtractor::default();
        let report = extractor.extract_page(&Page::letter(2)).unwrap();
        assert!(report.rows.is_empty());
        assert!(report.warnings[0].contains("no native text"));
    }

    #[test]
    fn test_private_use_glyphs_yield_no_rows() {
        let extractor = TextTableExtractor::default();
        let glyphs: String = ('\u{E001}'..='\u{E00A}').collect();
        let page = Page::letter(3).with_span(TextSpan::new(glyphs, 72.0, 700.0, 24.0));
        let report = extractor.extract_page(&page).unwrap();

        assert!(report.rows.is_empty());
        assert!(report.warnings[0].contains("no usable cells"));
    }

    #[test]
    fn test_cells_are_cleaned_per_page() {
        let extractor = TextTableExtractor::default();
        let page = Page::new(0, 400.0, 600.0)
            .with_span(span("nan", 72.0, 500.0))
            .with_span(span("Net\u{E000}   total", 72.0, 480.0));
        let report = extractor.extract_page(&page).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].texts(), vec!["Net total"]);
    }

    #[test]
    fn test_damaged_page_is_decode_error() {
        let extractor = TextTableExtractor::default();
        let result = extractor.extract_page(&Page::damaged(1, 612.0, 792.0, "bad object"));
        assert!(matches!(result, Err(Error::PageDecode { page: 1, .. })));
    }

    #[test]
    fn test_extract_document() {
        let extractor = TextTableExtractor::new(ExtractOptions::default().sequential());
        let document = Document::from_pages(vec![table_page(0), Page::letter(1), table_page(2)]);
        let result = extractor.extract(&document);

        assert_eq!(result.category, DocumentCategory::TextNative);
        assert_eq!(result.pages_failed.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(result.rows_for_page(0).count(), result.rows_for_page(2).count());
    }
}
