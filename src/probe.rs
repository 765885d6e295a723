//! Page structure measurement.
//!
//! The probe reduces a page to three numbers: how much of it is covered by
//! native text, how much by raster images, and how many ruled lines it draws.

use crate::model::{clamp_unit, Page, PageSignature};

/// Perpendicular drift (points) still accepted as horizontal or vertical.
const AXIS_TOLERANCE: f32 = 0.5;

/// Measures [`PageSignature`]s from decoded pages.
#[derive(Debug, Clone, Copy)]
pub struct PageStructureProbe {
    min_line_length: f32,
}

impl PageStructureProbe {
    /// Create a probe counting ruled lines of at least `min_line_length` points.
    pub fn new(min_line_length: f32) -> Self {
        Self { min_line_length }
    }

    /// Measure one page. A page without content, or one that failed to
    /// decode, measures as all zeros.
    pub fn measure(&self, page: &Page) -> PageSignature {
        let area = page.area();
        if page.is_damaged() || area <= 0.0 {
            return PageSignature::default();
        }

        let bounds = page.bounds();

        let text_area: f32 = page
            .spans
            .iter()
            .filter(|s| s.glyph_count() > 0)
            .filter_map(|s| s.bbox().intersection(&bounds))
            .map(|r| r.area())
            .sum();

        let image_area: f32 = page
            .images
            .iter()
            .filter_map(|img| img.bbox.intersection(&bounds))
            .map(|r| r.area())
            .sum();

        let grid_signal = page
            .segments
            .iter()
            .filter(|s| s.is_axis_aligned(AXIS_TOLERANCE) && s.length() >= self.min_line_length)
            .count() as u32;

        let signature = PageSignature {
            text_density: clamp_unit(text_area / area),
            image_coverage: clamp_unit(image_area / area),
            grid_signal,
        };

        log::debug!(
            "PageStructureProbe: page {} density={:.3} coverage={:.3} grid={}",
            page.index,
            signature.text_density,
            signature.image_coverage,
            signature.grid_signal
        );

        signature
    }
}

impl Default for PageStructureProbe {
    fn default() -> Self {
        Self::new(20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineSegment, PageImage, Rect, TextSpan};

    #[test]
    fn test_empty_page_is_zero() {
        let probe = PageStructureProbe::default();
        let sig = probe.measure(&Page::letter(0));
        assert_eq!(sig, PageSignature::default());
    }

    #[test]
    fn test_damaged_page_is_zero() {
        let probe = PageStructureProbe::default();
        let page = Page::damaged(0, 612.0, 792.0, "bad xref")
            .with_span(TextSpan::new("ignored", 10.0, 10.0, 12.0));
        assert_eq!(probe.measure(&page), PageSignature::default());
    }

    #[test]
    fn test_text_density_is_normalized_by_page_area() {
        let probe = PageStructureProbe::default();
        // 10 chars * 10pt * 0.5 = 50pt wide, 10pt tall => 500pt² on a 100x100 page
        let page = Page::new(0, 100.0, 100.0).with_span(TextSpan::new("abcdefghij", 10.0, 50.0, 10.0));
        let sig = probe.measure(&page);
        assert!((sig.text_density - 0.05).abs() < 1e-6);

        // Same span on a page four times larger gives a quarter of the density
        let page = Page::new(0, 200.0, 200.0).with_span(TextSpan::new("abcdefghij", 10.0, 50.0, 10.0));
        let sig = probe.measure(&page);
        assert!((sig.text_density - 0.0125).abs() < 1e-6);
    }

    #[test]
    fn test_image_coverage_clips_and_clamps() {
        let probe = PageStructureProbe::default();
        // Half of the image hangs off the page
        let page = Page::new(0, 100.0, 100.0)
            .with_image(PageImage::placed(Rect::new(50.0, 0.0, 150.0, 100.0)));
        assert!((probe.measure(&page).image_coverage - 0.5).abs() < 1e-6);

        // Two overlapping full-page images still cap at 1.0
        let page = Page::new(0, 100.0, 100.0)
            .with_image(PageImage::placed(Rect::new(0.0, 0.0, 100.0, 100.0)))
            .with_image(PageImage::placed(Rect::new(0.0, 0.0, 100.0, 100.0)));
        assert_eq!(probe.measure(&page).image_coverage, 1.0);
    }

    #[test]
    fn test_grid_signal_skips_short_and_diagonal_lines() {
        let probe = PageStructureProbe::new(20.0);
        let page = Page::letter(0)
            .with_segment(LineSegment::new(0.0, 100.0, 300.0, 100.0))
            .with_segment(LineSegment::new(50.0, 0.0, 50.0, 400.0))
            .with_segment(LineSegment::new(0.0, 50.0, 5.0, 50.0))
            .with_segment(LineSegment::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(probe.measure(&page).grid_signal, 2);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let probe = PageStructureProbe::default();
        let page = Page::letter(0)
            .with_span(TextSpan::new("Quarterly revenue", 72.0, 700.0, 12.0))
            .with_image(PageImage::placed(Rect::new(72.0, 300.0, 300.0, 500.0)))
            .with_segment(LineSegment::new(72.0, 290.0, 540.0, 290.0));
        assert_eq!(probe.measure(&page), probe.measure(&page));
    }
}
