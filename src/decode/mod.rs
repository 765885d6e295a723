//! Decoding PDF bytes into the page model.
//!
//! Document-level problems (not a PDF, broken xref, encryption) fail the
//! whole decode. A page whose content cannot be read becomes a damaged page
//! so the rest of the document stays usable.

mod content;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use crate::detect::sniff_pdf;
use crate::error::{Error, Result};
use crate::model::{Document, Metadata, Page, Rect};

use content::{number, resolve, stream_bytes, Interpreter, Matrix, Resources};

/// Default page size (US Letter) when no MediaBox is present.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Page tree depth limit when following /Parent links.
const MAX_TREE_DEPTH: usize = 32;

/// Decode a PDF from bytes.
pub fn decode_bytes(data: &[u8]) -> Result<Document> {
    let format = sniff_pdf(data)?;
    log::debug!("Decoding {} ({} bytes)", format, data.len());

    // Decryption failures surface as Error::Encrypted
    let doc = LopdfDocument::load_mem(data)?;

    Ok(decode_document(&doc))
}

/// Decode a PDF from a reader.
pub fn decode_reader<R: std::io::Read>(mut reader: R) -> Result<Document> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data)?;
    decode_bytes(&data)
}

/// Convert a loaded lopdf document into the page model.
pub fn decode_document(doc: &LopdfDocument) -> Document {
    let pages: Vec<Page> = doc
        .get_pages()
        .values()
        .enumerate()
        .map(|(index, &page_id)| decode_page(doc, index, page_id))
        .collect();

    let damaged = pages.iter().filter(|p| p.is_damaged()).count();
    if damaged > 0 {
        log::warn!("{} of {} pages could not be decoded", damaged, pages.len());
    }

    Document::with_metadata(read_metadata(doc), pages)
}

fn decode_page(doc: &LopdfDocument, index: usize, page_id: ObjectId) -> Page {
    let media_box = media_box(doc, page_id).unwrap_or(DEFAULT_MEDIA_BOX);
    let (width, height) = (media_box.width(), media_box.height());

    match read_page(doc, page_id, &media_box) {
        Ok(content) => {
            log::debug!(
                "Page {}: {} spans, {} images, {} segments",
                index,
                content.spans.len(),
                content.images.len(),
                content.segments.len()
            );
            let mut page = Page::new(index, width, height);
            page.spans = content.spans;
            page.images = content.images;
            page.segments = content.segments;
            page
        }
        Err(e) => {
            log::warn!("Page {} could not be decoded: {}", index, e);
            Page::damaged(index, width, height, e.to_string())
        }
    }
}

fn read_page(
    doc: &LopdfDocument,
    page_id: ObjectId,
    media_box: &Rect,
) -> Result<content::PageContent> {
    let data = page_content(doc, page_id)?;

    let resources = match inherited(doc, page_id, b"Resources")? {
        Some(obj) => {
            let dict = resolve(doc, obj)
                .as_dict()
                .map_err(|_| Error::PdfParse("/Resources is not a dictionary".to_string()))?;
            Resources::from_dict(doc, dict)
        }
        None => Resources::default(),
    };

    // Page space has its origin at the MediaBox corner
    let base = Matrix::translation(-media_box.x0, -media_box.y0);
    Interpreter::new(doc).run(&data, &resources, base)
}

/// Concatenated, decompressed content streams of a page.
fn page_content(doc: &LopdfDocument, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    let Ok(contents) = page_dict.get(b"Contents") else {
        // A page without content is blank
        return Ok(Vec::new());
    };

    match resolve(doc, contents) {
        Object::Stream(s) => stream_bytes(s),
        Object::Array(parts) => {
            let mut data = Vec::new();
            for part in parts {
                match resolve(doc, part) {
                    Object::Stream(s) => {
                        data.extend_from_slice(&stream_bytes(s)?);
                        data.push(b' ');
                    }
                    _ => return Err(Error::PdfParse("Invalid content stream".to_string())),
                }
            }
            Ok(data)
        }
        _ => Err(Error::PdfParse("Invalid content stream".to_string())),
    }
}

/// Look up a page attribute, walking up the page tree if needed.
fn inherited<'a>(
    doc: &'a LopdfDocument,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<&'a Object>> {
    let mut dict: &Dictionary = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::PdfParse(e.to_string()))?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return Ok(Some(value));
        }
        let Ok(parent) = dict.get(b"Parent").and_then(|p| p.as_reference()) else {
            return Ok(None);
        };
        dict = doc
            .get_dictionary(parent)
            .map_err(|e| Error::PdfParse(format!("invalid /Parent: {e}")))?;
    }

    Err(Error::PdfParse("page tree too deep".to_string()))
}

fn media_box(doc: &LopdfDocument, page_id: ObjectId) -> Option<Rect> {
    let obj = inherited(doc, page_id, b"MediaBox").ok()??;
    let values: Vec<f32> = resolve(doc, obj)
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| number(resolve(doc, o)))
        .collect();
    if values.len() < 4 {
        return None;
    }
    let rect = Rect::new(values[0], values[1], values[2], values[3]);
    (rect.area() > 0.0).then_some(rect)
}

fn read_metadata(doc: &LopdfDocument) -> Metadata {
    let mut metadata = Metadata {
        version: Some(doc.version.to_string()),
        encrypted: doc.is_encrypted(),
        ..Metadata::default()
    };

    if let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|o| resolve(doc, o).as_dict().ok())
    {
        metadata.producer = get_string_from_dict(info, b"Producer");
        metadata.creator = get_string_from_dict(info, b"Creator");
    }

    metadata
}

fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key).ok()? {
        Object::String(bytes, _) => {
            // UTF-16BE with BOM, the PDF text string encoding for Unicode
            if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
                let utf16: Vec<u16> = bytes[2..]
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect();
                String::from_utf16(&utf16).ok()
            } else {
                Some(
                    String::from_utf8(bytes.clone())
                        .unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect()),
                )
            }
        }
        Object::Name(bytes) => String::from_utf8(bytes.clone()).ok(),
        _ => None,
    }
}
