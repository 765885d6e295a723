//! Extraction output: rows and the result envelope.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Classification, DocumentCategory};

/// Where a row's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Native text parsing
    FromText,
    /// Optical character recognition
    FromOcr,
}

/// One row of the output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRow {
    /// Cell values; `None` is an empty cell
    pub cells: Vec<Option<String>>,
    /// Page the row was extracted from (0-based)
    pub page: usize,
    pub provenance: Provenance,
}

impl ExtractedRow {
    pub fn new(cells: Vec<Option<String>>, page: usize, provenance: Provenance) -> Self {
        Self {
            cells,
            page,
            provenance,
        }
    }

    /// Build a row from text cells; blank strings become empty cells.
    pub fn from_texts<I, S>(texts: I, page: usize, provenance: Provenance) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cells = texts
            .into_iter()
            .map(|text| {
                let text: String = text.into();
                if text.trim().is_empty() {
                    None
                } else {
                    Some(text)
                }
            })
            .collect();
        Self::new(cells, page, provenance)
    }

    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Whether every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Cell texts with empty cells as "".
    pub fn texts(&self) -> Vec<&str> {
        self.cells
            .iter()
            .map(|c| c.as_deref().unwrap_or(""))
            .collect()
    }
}

/// How the category of a run was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryDecision {
    /// The caller supplied the category
    Overridden,
    /// The classifier computed the category
    Computed(Classification),
}

/// Normalized output of one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Rows in page order, then extraction order within a page
    pub rows: Vec<ExtractedRow>,
    /// Category used for routing
    pub category: DocumentCategory,
    pub decision: CategoryDecision,
    /// Human-readable notes, including every absorbed page failure
    pub warnings: Vec<String>,
    /// Pages that produced no data
    pub pages_failed: BTreeSet<usize>,
    /// Number of pages in the source document
    pub page_count: usize,
}

impl ExtractionResult {
    /// Create an empty result for a document of `page_count` pages.
    pub fn new(category: DocumentCategory, page_count: usize) -> Self {
        Self {
            rows: Vec::new(),
            category,
            decision: CategoryDecision::Overridden,
            warnings: Vec::new(),
            pages_failed: BTreeSet::new(),
            page_count,
        }
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(ExtractedRow::width).max().unwrap_or(0)
    }

    /// Rows extracted from one page.
    pub fn rows_for_page(&self, page: usize) -> impl Iterator<Item = &ExtractedRow> {
        self.rows.iter().filter(move |r| r.page == page)
    }

    /// Whether some, but not all, pages failed.
    pub fn is_partial(&self) -> bool {
        !self.pages_failed.is_empty() && self.pages_failed.len() < self.page_count
    }

    /// Whether every page failed.
    pub fn all_failed(&self) -> bool {
        self.page_count > 0 && self.pages_failed.len() >= self.page_count
    }

    /// Record a failed page with its reason.
    pub fn fail_page(&mut self, page: usize, warning: impl Into<String>) {
        self.pages_failed.insert(page);
        self.warnings.push(warning.into());
    }
}
