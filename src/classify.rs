//! Document classification from aggregated page signatures.
//!
//! The decision is made once on a document-level aggregate rather than by
//! per-page voting, so one outlier page cannot flip the category.

use crate::error::{Error, Result};
use crate::model::{Classification, Confidence, DocumentCategory, PageSignature};
use crate::options::{Aggregation, ExtractOptions};

/// Something that turns page signatures into a classification.
pub trait Classify: Send + Sync {
    /// Classify a document from its page signatures.
    ///
    /// Fails with [`Error::EmptyDocument`] when `signatures` is empty.
    fn classify(
        &self,
        signatures: &[PageSignature],
        options: &ExtractOptions,
    ) -> Result<Classification>;
}

/// Threshold classifier over the mean (or median) page signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentClassifier;

impl DocumentClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Classify for DocumentClassifier {
    fn classify(
        &self,
        signatures: &[PageSignature],
        options: &ExtractOptions,
    ) -> Result<Classification> {
        let aggregate = aggregate(signatures, options.aggregation)?;
        let density = aggregate.text_density;
        let coverage = aggregate.image_coverage;
        let text_hi = density >= options.text_threshold;
        let image_hi = coverage >= options.image_threshold;

        let category = match (text_hi, image_hi) {
            (true, false) => DocumentCategory::TextNative,
            (false, true) => DocumentCategory::Scanned,
            _ => DocumentCategory::Mixed,
        };

        let confidence = match (text_hi, image_hi) {
            (true, true) => Confidence::Medium,
            (false, false) => Confidence::Low,
            _ => {
                let margin = (density - options.text_threshold)
                    .abs()
                    .min((coverage - options.image_threshold).abs());
                if margin >= options.confidence_margin {
                    Confidence::High
                } else {
                    Confidence::Medium
                }
            }
        };

        log::debug!(
            "DocumentClassifier: {} pages, density={:.3} coverage={:.3} -> {} ({:?})",
            signatures.len(),
            density,
            coverage,
            category,
            confidence
        );

        Ok(Classification {
            category,
            confidence,
            aggregate,
            pages: signatures.len(),
        })
    }
}

/// Classify with the default classifier, returning only the category.
pub fn classify(signatures: &[PageSignature], options: &ExtractOptions) -> Result<DocumentCategory> {
    DocumentClassifier.classify(signatures, options).map(|c| c.category)
}

/// Classify with the default classifier, keeping the confidence signal.
pub fn classify_with_confidence(
    signatures: &[PageSignature],
    options: &ExtractOptions,
) -> Result<Classification> {
    DocumentClassifier.classify(signatures, options)
}

/// Combine page signatures field by field.
pub fn aggregate(signatures: &[PageSignature], method: Aggregation) -> Result<PageSignature> {
    if signatures.is_empty() {
        return Err(Error::EmptyDocument);
    }

    let densities: Vec<f32> = signatures.iter().map(|s| s.text_density).collect();
    let coverages: Vec<f32> = signatures.iter().map(|s| s.image_coverage).collect();
    let grids: Vec<f32> = signatures.iter().map(|s| s.grid_signal as f32).collect();

    let combine: fn(&[f32]) -> f32 = match method {
        Aggregation::Mean => mean,
        Aggregation::Median => median,
    };

    Ok(PageSignature::new(
        combine(&densities),
        combine(&coverages),
        combine(&grids).round() as u32,
    ))
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}

fn median(values: &[f32]) -> f32 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
