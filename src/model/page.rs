//! Page-level types.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An axis-aligned rectangle in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Create a rectangle from its lower-left corner and size.
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Overlapping region of two rectangles, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x1 > x0 && y1 > y0 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }
}

/// A run of native text with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Advance width of the run
    pub width: f32,
    /// Effective font size in points
    pub font_size: f32,
}

impl TextSpan {
    /// Create a span whose width is estimated from its character count.
    pub fn new(text: impl Into<String>, x: f32, y: f32, font_size: f32) -> Self {
        let text = text.into();
        let width = estimate_width(&text, font_size);
        Self {
            text,
            x,
            y,
            width,
            font_size,
        }
    }

    /// Override the advance width.
    pub fn with_width(mut self, width: f32) -> Self {
        self.width = width;
        self
    }

    /// Bounding box covering descender to ascender.
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.x,
            self.y - self.font_size * 0.2,
            self.x + self.width,
            self.y + self.font_size * 0.8,
        )
    }

    /// Number of non-whitespace characters.
    pub fn glyph_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// Average glyph advance as a fraction of the font size.
const AVG_ADVANCE: f32 = 0.5;

fn estimate_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * font_size * AVG_ADVANCE
}

/// An embedded raster image placed on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageImage {
    /// Placement on the page
    pub bbox: Rect,
    /// Intrinsic width in pixels (0 when unknown)
    pub pixel_width: u32,
    /// Intrinsic height in pixels (0 when unknown)
    pub pixel_height: u32,
    /// Stream filter, e.g. "DCTDecode"
    pub filter: Option<String>,
    /// Encoded image bytes as stored in the PDF
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl PageImage {
    /// Create an image placement without pixel data.
    pub fn placed(bbox: Rect) -> Self {
        Self {
            bbox,
            pixel_width: 0,
            pixel_height: 0,
            filter: None,
            data: Vec::new(),
        }
    }

    /// Attach encoded pixel data.
    pub fn with_data(mut self, width: u32, height: u32, data: Vec<u8>) -> Self {
        self.pixel_width = width;
        self.pixel_height = height;
        self.data = data;
        self
    }
}

/// A straight stroked or filled path segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl LineSegment {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn length(&self) -> f32 {
        let dx = self.x1 - self.x0;
        let dy = self.y1 - self.y0;
        (dx * dx + dy * dy).sqrt()
    }

    /// Whether the segment runs horizontally or vertically within `tolerance`.
    pub fn is_axis_aligned(&self, tolerance: f32) -> bool {
        (self.y1 - self.y0).abs() <= tolerance || (self.x1 - self.x0).abs() <= tolerance
    }
}

/// A single page of a decoded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page index (0-based)
    pub index: usize,

    /// Page width in points (1 point = 1/72 inch)
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Native text runs
    pub spans: Vec<TextSpan>,

    /// Embedded raster images
    pub images: Vec<PageImage>,

    /// Vector line primitives
    pub segments: Vec<LineSegment>,

    /// Decode failure reason for a page whose content could not be read
    damage: Option<String>,
}

impl Page {
    /// Create an empty page with the given dimensions.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            spans: Vec::new(),
            images: Vec::new(),
            segments: Vec::new(),
            damage: None,
        }
    }

    /// Create an empty page with standard Letter size (8.5 x 11 inches).
    pub fn letter(index: usize) -> Self {
        Self::new(index, 612.0, 792.0)
    }

    /// Create a page whose content could not be decoded.
    pub fn damaged(index: usize, width: f32, height: f32, reason: impl Into<String>) -> Self {
        Self {
            damage: Some(reason.into()),
            ..Self::new(index, width, height)
        }
    }

    pub fn with_span(mut self, span: TextSpan) -> Self {
        self.spans.push(span);
        self
    }

    pub fn with_image(mut self, image: PageImage) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_segment(mut self, segment: LineSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Page boundary as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }

    pub fn area(&self) -> f32 {
        (self.width * self.height).max(0.0)
    }

    /// Extractable native text length in characters.
    pub fn char_count(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether this page failed to decode.
    pub fn is_damaged(&self) -> bool {
        self.damage.is_some()
    }

    /// Fail with `PageDecode` if this page could not be decoded.
    pub fn ensure_readable(&self) -> Result<()> {
        match &self.damage {
            Some(reason) => Err(Error::PageDecode {
                page: self.index,
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}
