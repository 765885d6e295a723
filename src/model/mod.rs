//! Document model types.
//!
//! `Document` and `Page` are the decoded input the pipeline reads;
//! `PageSignature` and `Classification` are what the detector derives from
//! them; `ExtractionResult` is what the dispatcher hands back.

mod document;
mod page;
mod result;
mod signature;

pub use document::{Document, Metadata};
pub use page::{LineSegment, Page, PageImage, Rect, TextSpan};
pub use result::{CategoryDecision, ExtractedRow, ExtractionResult, Provenance};
pub use signature::{Classification, Confidence, DocumentCategory, PageSignature};

pub(crate) use signature::clamp_unit;
