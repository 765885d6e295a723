//! Content stream interpretation.
//!
//! Walks a page's operators and records what the page draws: positioned text
//! runs, placed raster images and straight path segments, all in page space.

use std::collections::BTreeMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document as LopdfDocument, Object, Stream};

use crate::error::{Error, Result};
use crate::model::{LineSegment, PageImage, Rect, TextSpan};

/// Nesting limit for form XObjects drawing other forms.
const MAX_FORM_DEPTH: usize = 8;
/// TJ adjustment (thousandths of an em) read as a word space.
const SPACE_THRESHOLD: f32 = 200.0;
/// Average glyph advance as a fraction of the font size.
const AVG_ADVANCE: f32 = 0.5;

/// An affine transform `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub(crate) fn translation(tx: f32, ty: f32) -> Self {
        Self {
            e: tx,
            f: ty,
            ..Self::IDENTITY
        }
    }

    /// Read six numeric operands.
    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().filter_map(number).collect();
        if n.len() < 6 {
            return None;
        }
        Some(Self {
            a: n[0],
            b: n[1],
            c: n[2],
            d: n[3],
            e: n[4],
            f: n[5],
        })
    }

    /// `self` applied first, then `other`.
    pub(crate) fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub(crate) fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    fn x_scale(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    fn y_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    /// Bounding box of the unit square under this transform.
    fn unit_square_bounds(&self) -> Rect {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for (x, y) in &corners[1..] {
            x0 = x0.min(*x);
            y0 = y0.min(*y);
            x1 = x1.max(*x);
            y1 = y1.max(*y);
        }
        Rect::new(x0, y0, x1, y1)
    }
}

/// Everything a content stream drew.
#[derive(Debug, Default)]
pub(crate) struct PageContent {
    pub spans: Vec<TextSpan>,
    pub images: Vec<PageImage>,
    pub segments: Vec<LineSegment>,
}

/// Fonts and XObjects visible to a content stream.
#[derive(Debug, Clone, Default)]
pub(crate) struct Resources<'a> {
    fonts: BTreeMap<Vec<u8>, &'a Dictionary>,
    xobjects: Option<&'a Dictionary>,
}

impl<'a> Resources<'a> {
    pub(crate) fn from_dict(doc: &'a LopdfDocument, dict: &'a Dictionary) -> Self {
        let mut fonts = BTreeMap::new();
        if let Some(font_dict) = dict
            .get(b"Font")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
        {
            for (name, font) in font_dict.iter() {
                if let Ok(font) = resolve(doc, font).as_dict() {
                    fonts.insert(name.clone(), font);
                }
            }
        }

        let xobjects = dict
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok());

        Self { fonts, xobjects }
    }

    fn xobject(&self, doc: &'a LopdfDocument, name: &[u8]) -> Option<&'a Stream> {
        let entry = self.xobjects?.get(name).ok()?;
        resolve(doc, entry).as_stream().ok()
    }
}

/// Text state carried across operators within one stream.
#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    leading: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    rise: f32,
    tm: Matrix,
    tlm: Matrix,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 12.0,
            leading: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            rise: 0.0,
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f32, ty: f32) {
        self.tlm = Matrix::translation(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        // Without TL, assume single spacing
        let leading = if self.leading == 0.0 {
            self.size * 1.2
        } else {
            self.leading
        };
        self.move_line(0.0, -leading);
    }
}

/// Straight segments of the path under construction, in page space.
#[derive(Debug, Default)]
struct PathBuilder {
    current: Option<(f32, f32)>,
    start: Option<(f32, f32)>,
    segments: Vec<LineSegment>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.start = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some((x, y)) = self.current {
            self.segments.push(LineSegment::new(x, y, p.0, p.1));
        }
        self.current = Some(p);
    }

    /// Curves move the current point without adding a straight segment.
    fn curve_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(current), Some(start)) = (self.current, self.start) {
            if current != start {
                self.line_to(start);
            }
        }
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, ctm: &Matrix) {
        self.move_to(ctm.apply(x, y));
        self.line_to(ctm.apply(x + w, y));
        self.line_to(ctm.apply(x + w, y + h));
        self.line_to(ctm.apply(x, y + h));
        self.close();
    }

    fn take(&mut self) -> Vec<LineSegment> {
        self.current = None;
        self.start = None;
        std::mem::take(&mut self.segments)
    }
}

/// Interprets content streams of one page.
pub(crate) struct Interpreter<'a> {
    doc: &'a LopdfDocument,
    out: PageContent,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(doc: &'a LopdfDocument) -> Self {
        Self {
            doc,
            out: PageContent::default(),
        }
    }

    /// Interpret `data` with `base` as the initial transform.
    pub(crate) fn run(
        mut self,
        data: &[u8],
        resources: &Resources<'a>,
        base: Matrix,
    ) -> Result<PageContent> {
        self.interpret(data, resources, base, 0)?;
        Ok(self.out)
    }

    fn interpret(
        &mut self,
        data: &[u8],
        resources: &Resources<'a>,
        base: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(data).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut ctm = base;
        let mut saved: Vec<Matrix> = Vec::new();
        let mut text = TextState::default();
        let mut path = PathBuilder::default();

        for op in &content.operations {
            let operands = op.operands.as_slice();
            let num = |i: usize| operands.get(i).and_then(number);

            match op.operator.as_str() {
                "q" => saved.push(ctm),
                "Q" => {
                    if let Some(m) = saved.pop() {
                        ctm = m;
                    }
                }
                "cm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        ctm = m.then(&ctm);
                    }
                }

                "BT" => {
                    text.tm = Matrix::IDENTITY;
                    text.tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        text.font = name.clone();
                    }
                    if let Some(size) = num(1) {
                        text.size = size;
                    }
                }
                "TL" => text.leading = num(0).unwrap_or(0.0),
                "Tc" => text.char_spacing = num(0).unwrap_or(0.0),
                "Tw" => text.word_spacing = num(0).unwrap_or(0.0),
                "Tz" => text.horizontal_scale = num(0).unwrap_or(100.0) / 100.0,
                "Ts" => text.rise = num(0).unwrap_or(0.0),
                "Td" => text.move_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
                "TD" => {
                    let ty = num(1).unwrap_or(0.0);
                    text.leading = -ty;
                    text.move_line(num(0).unwrap_or(0.0), ty);
                }
                "Tm" => {
                    if let Some(m) = Matrix::from_operands(operands) {
                        text.tm = m;
                        text.tlm = m;
                    }
                }
                "T*" => text.next_line(),
                "Tj" => self.show_text(&mut text, &ctm, resources, &operands[..operands.len().min(1)]),
                "'" => {
                    text.next_line();
                    self.show_text(&mut text, &ctm, resources, &operands[..operands.len().min(1)]);
                }
                "\"" => {
                    text.word_spacing = num(0).unwrap_or(text.word_spacing);
                    text.char_spacing = num(1).unwrap_or(text.char_spacing);
                    text.next_line();
                    if let Some(s) = operands.get(2) {
                        self.show_text(&mut text, &ctm, resources, std::slice::from_ref(s));
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = operands.first() {
                        self.show_text(&mut text, &ctm, resources, items);
                    }
                }

                "m" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        path.move_to(ctm.apply(x, y));
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) = (num(0), num(1)) {
                        path.line_to(ctm.apply(x, y));
                    }
                }
                "c" => {
                    if let (Some(x), Some(y)) = (num(4), num(5)) {
                        path.curve_to(ctm.apply(x, y));
                    }
                }
                "v" | "y" => {
                    if let (Some(x), Some(y)) = (num(2), num(3)) {
                        path.curve_to(ctm.apply(x, y));
                    }
                }
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) = (num(0), num(1), num(2), num(3)) {
                        path.rect(x, y, w, h, &ctm);
                    }
                }
                "h" => path.close(),
                "s" | "b" | "b*" => {
                    path.close();
                    self.out.segments.extend(path.take());
                }
                "S" | "f" | "F" | "f*" | "B" | "B*" => self.out.segments.extend(path.take()),
                "n" => {
                    path.take();
                }

                "Do" => {
                    if let Some(Object::Name(name)) = operands.first() {
                        self.draw_xobject(name, resources, &ctm, depth)?;
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn show_text(
        &mut self,
        text: &mut TextState,
        ctm: &Matrix,
        resources: &Resources<'a>,
        items: &[Object],
    ) {
        let font = resources.fonts.get(&text.font).copied();
        let encoding = font.and_then(|f| f.get_font_encoding(self.doc).ok());

        let mut combined = String::new();
        // Advance in unscaled text space
        let mut advance = 0.0;

        for item in items {
            match item {
                Object::String(bytes, _) => {
                    let decoded = match &encoding {
                        Some(enc) => LopdfDocument::decode_text(enc, bytes)
                            .unwrap_or_else(|_| decode_text_simple(bytes)),
                        None => decode_text_simple(bytes),
                    };
                    let chars = decoded.chars().count() as f32;
                    let spaces = decoded.chars().filter(|c| *c == ' ').count() as f32;
                    advance += (chars * (AVG_ADVANCE * text.size + text.char_spacing)
                        + spaces * text.word_spacing)
                        * text.horizontal_scale;
                    combined.push_str(&decoded);
                }
                other => {
                    if let Some(n) = number(other) {
                        advance -= n / 1000.0 * text.size * text.horizontal_scale;
                        let ends_in_space = combined.ends_with(' ') || combined.ends_with('\u{00A0}');
                        if -n > SPACE_THRESHOLD && !ends_in_space {
                            if let Some(last) = combined.chars().last() {
                                if !is_spaceless_script_char(last) {
                                    combined.push(' ');
                                }
                            }
                        }
                    }
                }
            }
        }

        let trm = Matrix::translation(0.0, text.rise).then(&text.tm).then(ctm);
        if !combined.trim().is_empty() {
            let (x, y) = trm.apply(0.0, 0.0);
            let size = text.size * trm.y_scale();
            let width = advance * trm.x_scale();
            let span = TextSpan::new(combined, x, y, size);
            self.out.spans.push(if width > 0.0 { span.with_width(width) } else { span });
        }

        text.tm = Matrix::translation(advance, 0.0).then(&text.tm);
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: &Resources<'a>,
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        let Some(stream) = resources.xobject(self.doc, name) else {
            log::debug!("XObject /{} not found", String::from_utf8_lossy(name));
            return Ok(());
        };

        let subtype = stream
            .dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| o.as_name_str().ok())
            .unwrap_or("");

        match subtype {
            "Image" => {
                let dimension = |key: &[u8]| {
                    stream
                        .dict
                        .get(key)
                        .ok()
                        .and_then(|o| o.as_i64().ok())
                        .unwrap_or(0)
                        .max(0) as u32
                };
                let filter = match stream.dict.get(b"Filter") {
                    Ok(Object::Name(n)) => Some(String::from_utf8_lossy(n).to_string()),
                    Ok(Object::Array(filters)) => filters
                        .last()
                        .and_then(|o| o.as_name_str().ok())
                        .map(str::to_string),
                    _ => None,
                };

                let mut image = PageImage::placed(ctm.unit_square_bounds()).with_data(
                    dimension(b"Width"),
                    dimension(b"Height"),
                    stream.content.clone(),
                );
                image.filter = filter;
                self.out.images.push(image);
            }
            "Form" if depth < MAX_FORM_DEPTH => {
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|o| o.as_array().ok())
                    .and_then(|a| Matrix::from_operands(a))
                    .unwrap_or(Matrix::IDENTITY);
                let inner = match stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| resolve(self.doc, o).as_dict().ok())
                {
                    Some(dict) => Resources::from_dict(self.doc, dict),
                    None => resources.clone(),
                };
                let data = stream_bytes(stream)?;
                self.interpret(&data, &inner, matrix.then(ctm), depth + 1)?;
            }
            "Form" => {
                log::warn!(
                    "Form XObject /{} nested deeper than {} levels, skipped",
                    String::from_utf8_lossy(name),
                    MAX_FORM_DEPTH
                );
            }
            _ => {}
        }

        Ok(())
    }
}

/// Follow one indirect reference.
pub(crate) fn resolve<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Stream data with its filters removed.
pub(crate) fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .map_err(|e| Error::PdfParse(e.to_string()))
    } else {
        Ok(stream.content.clone())
    }
}

/// Extract a number from a PDF object.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Simple text decoding fallback when no encoding is available.
fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Chinese and Japanese don't use spaces between words.
fn is_spaceless_script_char(c: char) -> bool {
    matches!(
        c as u32,
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(content: &str) -> PageContent {
        let doc = LopdfDocument::with_version("1.5");
        Interpreter::new(&doc)
            .run(content.as_bytes(), &Resources::default(), Matrix::IDENTITY)
            .unwrap()
    }

    #[test]
    fn test_matrix_composition() {
        let scale = Matrix {
            a: 2.0,
            d: 2.0,
            ..Matrix::IDENTITY
        };
        let m = Matrix::translation(10.0, 5.0).then(&scale);
        assert_eq!(m.apply(1.0, 1.0), (22.0, 12.0));
        assert_eq!(m.x_scale(), 2.0);
    }

    #[test]
    fn test_text_position_and_size() {
        let content = run("BT /F1 12 Tf 72 700 Td (Hello) Tj 0 -20 Td (World) Tj ET");
        assert_eq!(content.spans.len(), 2);
        assert_eq!(content.spans[0].text, "Hello");
        assert_eq!((content.spans[0].x, content.spans[0].y), (72.0, 700.0));
        assert_eq!(content.spans[1].y, 680.0);
        assert_eq!(content.spans[1].font_size, 12.0);
        // 5 glyphs at half an em each
        assert_eq!(content.spans[0].width, 30.0);
    }

    #[test]
    fn test_ctm_scales_text() {
        let content = run("q 2 0 0 2 0 0 cm BT /F1 10 Tf 10 10 Td (Big) Tj ET Q");
        let span = &content.spans[0];
        assert_eq!((span.x, span.y), (20.0, 20.0));
        assert_eq!(span.font_size, 20.0);
    }

    #[test]
    fn test_tj_kerning_inserts_space() {
        let content = run("BT /F1 10 Tf 0 0 Td [(Net) -300 (Total)] TJ ET");
        assert_eq!(content.spans[0].text, "Net Total");
    }

    #[test]
    fn test_segments_from_paths() {
        let content = run("0 0 m 100 0 l S 10 10 50 20 re f 0 0 m 5 5 l n");
        // One stroked line plus four rectangle edges; the n path is dropped
        assert_eq!(content.segments.len(), 5);
        assert_eq!(content.segments[0], LineSegment::new(0.0, 0.0, 100.0, 0.0));
    }

    #[test]
    fn test_graphics_state_restore() {
        let content = run("q 1 0 0 1 50 50 cm Q 0 0 m 10 0 l S");
        assert_eq!(content.segments[0], LineSegment::new(0.0, 0.0, 10.0, 0.0));
    }

    #[test]
    fn test_unit_square_bounds() {
        let placement = Matrix {
            a: 612.0,
            d: 792.0,
            ..Matrix::IDENTITY
        };
        let rect = placement.unit_square_bounds();
        assert_eq!(rect.area(), 612.0 * 792.0);
    }

    #[test]
    fn test_decode_text_simple() {
        assert_eq!(decode_text_simple(b"Hello"), "Hello");
        assert_eq!(decode_text_simple(&[0x48, 0x65, 0x6C, 0x6C, 0xE9]), "Hellé");
        assert_eq!(decode_text_simple(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }
}
