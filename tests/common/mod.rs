//! Shared helpers for integration tests: synthetic PDFs written with lopdf
//! and stub OCR engines.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pdftriage::{OcrEngine, RasterImage, Result};

pub const PAGE_WIDTH: f32 = 300.0;
pub const PAGE_HEIGHT: f32 = 200.0;

enum PageKind {
    Content {
        content: String,
        image: Option<Vec<u8>>,
    },
    Damaged,
}

/// Builds small multi-page PDFs in memory.
#[derive(Default)]
pub struct PdfBuilder {
    pages: Vec<PageKind>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page of native text rows, one text object per cell.
    pub fn text_page(mut self, rows: &[&[&str]]) -> Self {
        self.pages.push(PageKind::Content {
            content: table_content(rows),
            image: None,
        });
        self
    }

    /// A page that is one full-page image. The image bytes are `ocr_text`,
    /// which [`echo_engine`] reads back as the recognized text.
    pub fn scanned_page(mut self, ocr_text: &str) -> Self {
        self.pages.push(PageKind::Content {
            content: format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", PAGE_WIDTH, PAGE_HEIGHT),
            image: Some(ocr_text.as_bytes().to_vec()),
        });
        self
    }

    /// A page with ruled lines only.
    pub fn grid_page(mut self) -> Self {
        let mut content = String::from("0.5 w ");
        for i in 0..5 {
            let y = 40.0 + i as f32 * 30.0;
            content.push_str(&format!("20 {y} m 280 {y} l S "));
        }
        for x in [20.0, 150.0, 280.0] {
            content.push_str(&format!("{x} 40 m {x} 160 l S "));
        }
        self.pages.push(PageKind::Content {
            content,
            image: None,
        });
        self
    }

    /// A page whose /Contents is not a stream.
    pub fn damaged_page(mut self) -> Self {
        self.pages.push(PageKind::Damaged);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for kind in self.pages {
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            };
            match kind {
                PageKind::Content { content, image } => {
                    let mut resources = dictionary! {
                        "Font" => dictionary! { "F1" => font_id },
                    };
                    if let Some(data) = image {
                        let image_id = doc.add_object(Stream::new(
                            dictionary! {
                                "Type" => "XObject",
                                "Subtype" => "Image",
                                "Width" => 1250i64,
                                "Height" => 833i64,
                                "ColorSpace" => "DeviceGray",
                                "BitsPerComponent" => 8i64,
                            },
                            data,
                        ));
                        resources.set("XObject", dictionary! { "Im0" => image_id });
                    }
                    let content_id =
                        doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
                    page.set("Resources", resources);
                    page.set("Contents", content_id);
                }
                PageKind::Damaged => {
                    page.set("Contents", 42i64);
                }
            }
            kids.push(Object::from(doc.add_object(page)));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 300.into(), 200.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

/// Cells at fixed column offsets, rows from the top of the page down.
fn table_content(rows: &[&[&str]]) -> String {
    let mut content = String::new();
    for (r, cells) in rows.iter().enumerate() {
        let y = PAGE_HEIGHT - 30.0 - r as f32 * 18.0;
        for (c, cell) in cells.iter().enumerate() {
            let x = 20.0 + c as f32 * 100.0;
            content.push_str(&format!(
                "BT /F1 10 Tf 1 0 0 1 {x} {y} Tm ({}) Tj ET\n",
                escape(cell)
            ));
        }
    }
    content
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// A ledger table dense enough to classify as text-native.
pub const LEDGER: &[&[&str]] = &[
    &["Invoice number", "Customer name", "Amount due"],
    &["INV-2024-0001", "Acme Holdings", "1,200.00"],
    &["INV-2024-0002", "Borealis Ltd", "950.50"],
    &["INV-2024-0003", "Cobalt Works", "4,410.00"],
    &["INV-2024-0004", "Delta Freight", "310.75"],
    &["INV-2024-0005", "Evergreen Co", "2,045.10"],
    &["INV-2024-0006", "Fulcrum Labs", "780.00"],
    &["INV-2024-0007", "Granite Bank", "15,900.00"],
];

/// OCR engine that returns the image bytes as text.
pub fn echo_engine() -> Arc<dyn OcrEngine> {
    Arc::new(|image: &RasterImage, _: &str| -> Result<String> {
        Ok(String::from_utf8_lossy(&image.data).to_string())
    })
}

/// Echo engine that counts its calls.
pub fn counting_engine() -> (Arc<dyn OcrEngine>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let engine: Arc<dyn OcrEngine> = Arc::new(move |image: &RasterImage, _: &str| -> Result<String> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(String::from_utf8_lossy(&image.data).to_string())
    });
    (engine, calls)
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
