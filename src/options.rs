//! Pipeline options and configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options controlling classification and extraction.
///
/// Every field has a default; callers override per invocation with the
/// `with_*` builders or by deserializing a partial JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Aggregate text density at or above which a document counts as text
    pub text_threshold: f32,

    /// Aggregate image coverage at or above which a document counts as scanned
    pub image_threshold: f32,

    /// How page signatures are combined into one document signature
    pub aggregation: Aggregation,

    /// Distance from both thresholds required for a high-confidence label
    pub confidence_margin: f32,

    /// Minimum length (points) of a ruled line counted as grid structure
    pub min_line_length: f32,

    /// Text density below which the text pass treats a page as textless
    pub min_text_density: f32,

    /// Rasterization resolution for OCR
    pub dpi: u32,

    /// Per-page OCR timeout in milliseconds
    pub ocr_timeout_ms: u64,

    /// Maximum number of pages processed at once (1 = sequential)
    pub max_page_concurrency: usize,

    /// Language hint passed to the OCR engine
    pub language_hint: String,

    /// How OCR text lines are split into cells
    pub column_split: ColumnSplit,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Set both classification thresholds.
    pub fn with_thresholds(mut self, text: f32, image: f32) -> Self {
        self.text_threshold = text;
        self.image_threshold = image;
        self
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_min_line_length(mut self, points: f32) -> Self {
        self.min_line_length = points;
        self
    }

    pub fn with_min_text_density(mut self, density: f32) -> Self {
        self.min_text_density = density;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    pub fn with_ocr_timeout_ms(mut self, ms: u64) -> Self {
        self.ocr_timeout_ms = ms;
        self
    }

    /// Set the page concurrency limit.
    pub fn with_concurrency(mut self, pages: usize) -> Self {
        self.max_page_concurrency = pages;
        self
    }

    /// Process pages one at a time.
    pub fn sequential(mut self) -> Self {
        self.max_page_concurrency = 1;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_hint = language.into();
        self
    }

    pub fn with_column_split(mut self, split: ColumnSplit) -> Self {
        self.column_split = split;
        self
    }

    /// Check every option against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if !(self.text_threshold > 0.0 && self.text_threshold < 1.0) {
            return Err(invalid(format!(
                "text_threshold must be in (0, 1), got {}",
                self.text_threshold
            )));
        }
        if !(self.image_threshold > 0.0 && self.image_threshold < 1.0) {
            return Err(invalid(format!(
                "image_threshold must be in (0, 1), got {}",
                self.image_threshold
            )));
        }
        if !(self.confidence_margin >= 0.0 && self.confidence_margin < 1.0) {
            return Err(invalid(format!(
                "confidence_margin must be in [0, 1), got {}",
                self.confidence_margin
            )));
        }
        if !(self.min_line_length > 0.0) {
            return Err(invalid(format!(
                "min_line_length must be positive, got {}",
                self.min_line_length
            )));
        }
        if !(self.min_text_density >= 0.0 && self.min_text_density < 1.0) {
            return Err(invalid(format!(
                "min_text_density must be in [0, 1), got {}",
                self.min_text_density
            )));
        }
        if self.dpi == 0 {
            return Err(invalid("dpi must be positive".to_string()));
        }
        if self.ocr_timeout_ms == 0 {
            return Err(invalid("ocr_timeout_ms must be positive".to_string()));
        }
        if self.max_page_concurrency == 0 {
            return Err(invalid("max_page_concurrency must be at least 1".to_string()));
        }
        if self.language_hint.trim().is_empty() {
            return Err(invalid("language_hint must not be empty".to_string()));
        }
        self.column_split.validate()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            text_threshold: 0.15,
            image_threshold: 0.6,
            aggregation: Aggregation::Mean,
            confidence_margin: 0.1,
            min_line_length: 20.0,
            min_text_density: 0.002,
            dpi: 300,
            ocr_timeout_ms: 30_000,
            max_page_concurrency: default_concurrency(),
            language_hint: "eng".to_string(),
            column_split: ColumnSplit::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig(message)
}

/// How page signatures are combined into a document signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Arithmetic mean of each field
    #[default]
    Mean,
    /// Median of each field
    Median,
}

/// How one OCR text line is split into cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ColumnSplit {
    /// Split on tabs or on runs of at least `min_run` whitespace characters
    Whitespace { min_run: usize },
    /// Split on a single delimiter character
    Delimiter { delimiter: char },
    /// Split on a regular expression
    Pattern { pattern: String },
    /// Keep each line as one cell
    WholeLine,
}

impl ColumnSplit {
    fn validate(&self) -> Result<()> {
        match self {
            ColumnSplit::Whitespace { min_run } if *min_run == 0 => Err(invalid(
                "column_split.min_run must be at least 1".to_string(),
            )),
            ColumnSplit::Pattern { pattern } => Regex::new(pattern)
                .map(|_| ())
                .map_err(|e| invalid(format!("column_split.pattern: {e}"))),
            _ => Ok(()),
        }
    }
}

impl Default for ColumnSplit {
    fn default() -> Self {
        ColumnSplit::Whitespace { min_run: 2 }
    }
}
