//! Table detection from text positions.
//!
//! Two modes: *ruled* tables, whose column boundaries come from vertical
//! rules drawn on the page, and *stream* tables (Camelot's Stream mode),
//! whose columns are inferred from left edges that line up across rows.

use std::collections::{HashMap, HashSet};

use crate::model::{LineSegment, TextSpan};

/// A detected table region with its content.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Column start positions (X coordinates), left to right
    pub columns: Vec<f32>,
    /// Right boundary of the last column
    pub right_x: f32,
    /// Rows from top to bottom
    pub rows: Vec<TableRowData>,
}

/// A row of spans sharing a baseline.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Average baseline of the row
    pub y: f32,
    /// Span indices into the page's span list, sorted by X
    pub spans: Vec<usize>,
}

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping spans into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
    /// Minimum length of a vertical rule used as a column boundary (points)
    pub min_rule_length: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
            min_rule_length: 20.0,
        }
    }
}

/// Bucket width for grouping left edges.
const EDGE_BUCKET: f32 = 5.0;
/// Distance from a column edge still counted as aligned.
const ALIGN_TOLERANCE: f32 = 5.0;

/// Detects tables in a page's spans.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect tables, returning them with the indices of spans they did not use.
    pub fn detect(
        &self,
        spans: &[TextSpan],
        segments: &[LineSegment],
    ) -> (Vec<DetectedTable>, Vec<usize>) {
        let mut remaining: Vec<usize> = (0..spans.len()).collect();
        let mut tables = Vec::new();

        if let Some(table) = self.detect_ruled(spans, &remaining, segments) {
            let used: HashSet<usize> = table.rows.iter().flat_map(|r| r.spans.iter().copied()).collect();
            remaining.retain(|i| !used.contains(i));
            tables.push(table);
        }

        let (stream_tables, unused) = self.detect_stream(spans, remaining);
        tables.extend(stream_tables);
        (tables, unused)
    }

    /// Table bounded by vertical rules.
    fn detect_ruled(
        &self,
        spans: &[TextSpan],
        candidates: &[usize],
        segments: &[LineSegment],
    ) -> Option<DetectedTable> {
        let verticals: Vec<&LineSegment> = segments
            .iter()
            .filter(|s| (s.x1 - s.x0).abs() <= 0.5 && s.length() >= self.config.min_rule_length)
            .collect();
        if verticals.len() < self.config.min_columns + 1 {
            return None;
        }

        let mut xs: Vec<f32> = verticals.iter().map(|s| (s.x0 + s.x1) / 2.0).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let rules = merge_close(xs, self.config.min_column_gap);
        if rules.len() < self.config.min_columns + 1 {
            return None;
        }

        let bottom = verticals
            .iter()
            .map(|s| s.y0.min(s.y1))
            .fold(f32::MAX, f32::min);
        let top = verticals
            .iter()
            .map(|s| s.y0.max(s.y1))
            .fold(f32::MIN, f32::max);
        let left = rules[0];
        let right = rules[rules.len() - 1];

        let inside: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| {
                let s = &spans[i];
                s.x >= left - ALIGN_TOLERANCE && s.x < right && s.y >= bottom && s.y <= top
            })
            .collect();

        let rows = self.group_into_rows(spans, &inside);
        if rows.len() < self.config.min_rows {
            return None;
        }

        log::debug!(
            "TableDetector: ruled table with {} columns, {} rows",
            rules.len() - 1,
            rows.len()
        );

        Some(DetectedTable {
            columns: rules[..rules.len() - 1].to_vec(),
            right_x: right,
            rows,
        })
    }

    /// Tables inferred from text alignment alone.
    fn detect_stream(
        &self,
        spans: &[TextSpan],
        candidates: Vec<usize>,
    ) -> (Vec<DetectedTable>, Vec<usize>) {
        log::debug!("TableDetector: starting with {} spans", candidates.len());

        if candidates.len() < self.config.min_rows * self.config.min_columns {
            return (vec![], candidates);
        }

        let rows = self.group_into_rows(spans, &candidates);
        if rows.len() < self.config.min_rows {
            return (vec![], candidates);
        }

        let columns = self.detect_columns(spans, &rows);
        log::debug!(
            "TableDetector: detected {} columns at positions: {:?}",
            columns.len(),
            columns
        );
        if columns.len() < self.config.min_columns {
            return (vec![], candidates);
        }

        let mut tables = Vec::new();
        let mut used: HashSet<usize> = HashSet::new();

        for (start, end) in self.find_table_regions(spans, &rows, &columns) {
            let table_rows = rows[start..=end].to_vec();

            // Re-detect columns for this specific region
            let table_columns = self.detect_columns(spans, &table_rows);
            if table_columns.len() < self.config.min_columns {
                continue;
            }
            if table_columns.len() > self.config.max_columns {
                log::debug!(
                    "TableDetector: skipping region, too many columns ({} > {})",
                    table_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(spans, &table_rows, &table_columns) {
                log::debug!("TableDetector: skipping region, detected as list pattern");
                continue;
            }

            let right_x = table_rows
                .iter()
                .flat_map(|r| r.spans.iter())
                .map(|&i| spans[i].x + spans[i].width)
                .fold(f32::MIN, f32::max);

            used.extend(table_rows.iter().flat_map(|r| r.spans.iter().copied()));
            tables.push(DetectedTable {
                columns: table_columns,
                right_x,
                rows: table_rows,
            });
        }

        let unused = candidates.into_iter().filter(|i| !used.contains(i)).collect();
        (tables, unused)
    }

    /// Group spans into rows by baseline, top row first.
    pub fn group_into_rows(&self, spans: &[TextSpan], indices: &[usize]) -> Vec<TableRowData> {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            let (a, b) = (&spans[a], &spans[b]);
            b.y.partial_cmp(&a.y)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_y: Option<f32> = None;

        for idx in sorted {
            let span = &spans[idx];
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(idx),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(spans, std::mem::take(&mut current)));
                    }
                    current_y = Some(span.y);
                    current.push(idx);
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(spans, current));
        }

        rows
    }

    /// Column boundaries from left edges shared by enough rows.
    fn detect_columns(&self, spans: &[TextSpan], rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let basis: Vec<&TableRowData> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if basis.is_empty() {
            return vec![];
        }

        let mut edge_counts: HashMap<i32, usize> = HashMap::new();
        for row in &basis {
            // Count each bucket once per row
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|&i| (spans[i].x / EDGE_BUCKET).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((basis.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);

        let mut edges: Vec<f32> = edge_counts
            .into_iter()
            .filter(|(_, count)| *count >= min_occurrences)
            .map(|(bucket, _)| bucket as f32 * EDGE_BUCKET)
            .collect();
        edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        merge_close(edges, self.config.min_column_gap)
    }

    /// Contiguous runs of rows that align with `columns`.
    fn find_table_regions(
        &self,
        spans: &[TextSpan],
        rows: &[TableRowData],
        columns: &[f32],
    ) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = alignment_score(spans, row, columns) >= self.config.min_alignment_ratio
                && row.spans.len() >= 2;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    if i - s >= self.config.min_rows {
                        regions.push((s, i - 1));
                    }
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    /// Whether the rows are a numbered or bulleted list split into two spans.
    fn is_list_pattern(&self, spans: &[TextSpan], rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            if let Some(&first) = row.spans.first() {
                let text = spans[first].text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;

        // Numbered first columns are common in real tables, so only the
        // two-column case is rejected for them.
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }

    /// Cell texts of each table row, paired with the row's baseline.
    pub fn table_cells(&self, spans: &[TextSpan], table: &DetectedTable) -> Vec<(f32, Vec<String>)> {
        table
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); table.columns.len()];
                for &i in &row.spans {
                    let col = find_column(spans[i].x, &table.columns, table.right_x);
                    cells[col].push(spans[i].text.trim());
                }
                let texts = cells.into_iter().map(|parts| parts.join(" ")).collect();
                (row.y, texts)
            })
            .collect()
    }
}

fn make_row(spans: &[TextSpan], mut indices: Vec<usize>) -> TableRowData {
    indices.sort_by(|&a, &b| {
        spans[a]
            .x
            .partial_cmp(&spans[b].x)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let y = indices.iter().map(|&i| spans[i].y).sum::<f32>() / indices.len() as f32;
    TableRowData { y, spans: indices }
}

/// Drop sorted edges closer than `min_gap` to the previous kept edge.
fn merge_close(sorted: Vec<f32>, min_gap: f32) -> Vec<f32> {
    let mut merged: Vec<f32> = Vec::with_capacity(sorted.len());
    for edge in sorted {
        match merged.last() {
            Some(&last) if edge - last < min_gap => {}
            _ => merged.push(edge),
        }
    }
    merged
}

fn alignment_score(spans: &[TextSpan], row: &TableRowData, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|&&i| columns.iter().any(|col| (spans[i].x - col).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Column index for a span starting at `x`.
fn find_column(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        // Allow spans that begin slightly before their column
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "◇" | "▶" | "➤"
    )
}

/// Numbered markers like "1.", "12)", "a." or a bare number.
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (digits, rest) = cleaned.split_at(pos);
        if !digits.is_empty() && (rest == "." || rest == ")") {
            return true;
        }
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
