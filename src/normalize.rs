//! Output normalization into one row shape.

use unicode_normalization::UnicodeNormalization;

use crate::model::{ExtractedRow, ExtractionResult, Provenance};

/// Cell values treated as empty.
const NULL_MARKERS: &[&str] = &["None", "none", "null", "NaN", "nan"];

/// Clean one cell: NFKC, control and private-use characters removed,
/// internal whitespace collapsed and the ends trimmed. Empty or null-marker
/// text becomes `None`.
pub fn clean_cell(cell: &str) -> Option<String> {
    let normalized: String = cell
        .nfkc()
        .filter(|c| !is_private_use(*c) && *c != '\u{FFFD}')
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let collapsed = normalized.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || NULL_MARKERS.contains(&collapsed.as_str()) {
        None
    } else {
        Some(collapsed)
    }
}

fn is_private_use(c: char) -> bool {
    let code = c as u32;
    (0xE000..=0xF8FF).contains(&code)
        || (0xF0000..=0xFFFFD).contains(&code)
        || (0x100000..=0x10FFFD).contains(&code)
}

/// Build the rows of one page from raw cell texts, cleaning every cell and
/// dropping rows left blank. Column dropping and padding are applied later
/// over the whole document by [`normalize_rows`].
pub fn clean_page_rows<I>(lines: I, page: usize, provenance: Provenance) -> Vec<ExtractedRow>
where
    I: IntoIterator<Item = Vec<String>>,
{
    lines
        .into_iter()
        .map(|cells| {
            let cells = cells.iter().map(|c| clean_cell(c)).collect();
            ExtractedRow::new(cells, page, provenance)
        })
        .filter(|row| !row.is_blank())
        .collect()
}

/// Normalize rows in place: clean every cell, drop rows and columns left
/// without content and pad the rest to the widest row.
pub fn normalize_rows(rows: &mut Vec<ExtractedRow>) {
    for row in rows.iter_mut() {
        for cell in row.cells.iter_mut() {
            *cell = cell.as_deref().and_then(clean_cell);
        }
    }
    rows.retain(|row| !row.is_blank());

    let width = rows.iter().map(ExtractedRow::width).max().unwrap_or(0);
    let keep: Vec<bool> = (0..width)
        .map(|col| rows.iter().any(|r| matches!(r.cells.get(col), Some(Some(_)))))
        .collect();

    for row in rows.iter_mut() {
        row.cells.resize(width, None);
        let mut col = 0;
        row.cells.retain(|_| {
            let kept = keep[col];
            col += 1;
            kept
        });
    }
}

/// Normalize the rows of a result.
pub fn normalize(result: &mut ExtractionResult) {
    let before = result.rows.len();
    normalize_rows(&mut result.rows);
    if result.rows.len() < before {
        log::debug!(
            "normalize: dropped {} empty rows",
            before - result.rows.len()
        );
    }
}
