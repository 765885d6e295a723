//! Per-page structure measurements and the classification they feed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Structure measurement of one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSignature {
    /// Fraction of page area covered by native text glyphs, in [0, 1]
    pub text_density: f32,
    /// Fraction of page area covered by raster images, in [0, 1]
    pub image_coverage: f32,
    /// Number of ruled lines long enough to suggest table structure
    pub grid_signal: u32,
}

impl PageSignature {
    /// Create a signature, clamping density and coverage into [0, 1].
    pub fn new(text_density: f32, image_coverage: f32, grid_signal: u32) -> Self {
        Self {
            text_density: clamp_unit(text_density),
            image_coverage: clamp_unit(image_coverage),
            grid_signal,
        }
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Structural category of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Text stored as selectable character data
    TextNative,
    /// Pages are raster images without character data
    Scanned,
    /// Inconsistent or combined text and image content
    Mixed,
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentCategory::TextNative => "text-native",
            DocumentCategory::Scanned => "scanned",
            DocumentCategory::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// How sure the classifier is about its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// Outcome of classifying a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub category: DocumentCategory,
    pub confidence: Confidence,
    /// Document-level aggregate the decision was made on
    pub aggregate: PageSignature,
    /// Number of pages aggregated
    pub pages: usize,
}
