//! Document-level types.

use super::Page;
use serde::{Deserialize, Serialize};

/// A decoded PDF document: an ordered, immutable sequence of pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    metadata: Metadata,
    pages: Vec<Page>,
}

impl Document {
    /// Build a document from pages in order.
    ///
    /// Page indices are reassigned to match their position.
    pub fn from_pages(pages: Vec<Page>) -> Self {
        Self::with_metadata(Metadata::default(), pages)
    }

    /// Build a document with metadata from pages in order.
    pub fn with_metadata(metadata: Metadata, mut pages: Vec<Page>) -> Self {
        for (position, page) in pages.iter_mut().enumerate() {
            page.index = position;
        }
        Self { metadata, pages }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Get a page by index (0-based).
    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Check if the document has any pages.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Document metadata read from the PDF header and info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// PDF version (e.g., "1.7")
    pub version: Option<String>,
    /// Producer application
    pub producer: Option<String>,
    /// Creator application
    pub creator: Option<String>,
    /// Whether the document is encrypted
    pub encrypted: bool,
}
