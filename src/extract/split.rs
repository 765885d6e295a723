//! Splitting recognized text lines into cells.

use regex::Regex;

use crate::error::{Error, Result};
use crate::options::ColumnSplit;

/// Splits a text line into cells according to a [`ColumnSplit`] mode.
#[derive(Debug, Clone)]
pub struct ColumnSplitter {
    mode: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    Regex(Regex),
    Delimiter(char),
    WholeLine,
}

impl ColumnSplitter {
    pub fn new(split: &ColumnSplit) -> Result<Self> {
        let mode = match split {
            ColumnSplit::Whitespace { min_run } => {
                let pattern = format!(r"\s{{{},}}|\t+", (*min_run).max(1));
                Mode::Regex(compile(&pattern)?)
            }
            ColumnSplit::Delimiter { delimiter } => Mode::Delimiter(*delimiter),
            ColumnSplit::Pattern { pattern } => Mode::Regex(compile(pattern)?),
            ColumnSplit::WholeLine => Mode::WholeLine,
        };
        Ok(Self { mode })
    }

    /// Split one line; surrounding whitespace is trimmed from each cell.
    pub fn split(&self, line: &str) -> Vec<String> {
        let line = line.trim();
        match &self.mode {
            Mode::Regex(re) => re.split(line).map(|c| c.trim().to_string()).collect(),
            Mode::Delimiter(d) => line.split(*d).map(|c| c.trim().to_string()).collect(),
            Mode::WholeLine => vec![line.to_string()],
        }
    }

    /// Split every non-blank line of `text`.
    pub fn split_text(&self, text: &str) -> Vec<Vec<String>> {
        text.lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| self.split(l))
            .collect()
    }
}

impl Default for ColumnSplitter {
    fn default() -> Self {
        Self::new(&ColumnSplit::default()).unwrap_or(Self {
            mode: Mode::WholeLine,
        })
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::InvalidConfig(format!("column_split.pattern: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_runs_split_cells() {
        let splitter = ColumnSplitter::default();
        assert_eq!(
            splitter.split("Invoice 42    2024-01-05\t$120.00"),
            vec!["Invoice 42", "2024-01-05", "$120.00"]
        );
    }

    #[test]
    fn test_default_matches_default_options() {
        let configured = ColumnSplitter::new(&ColumnSplit::default()).unwrap();
        let line = "Bolt  4 pcs\t0.10";
        assert_eq!(ColumnSplitter::default().split(line), configured.split(line));
        assert_eq!(configured.split(line), vec!["Bolt", "4 pcs", "0.10"]);
    }

    #[test]
    fn test_min_run_is_configurable() {
        let splitter = ColumnSplitter::new(&ColumnSplit::Whitespace { min_run: 4 }).unwrap();
        assert_eq!(splitter.split("a  b    c"), vec!["a  b", "c"]);
    }

    #[test]
    fn test_delimiter_and_pattern() {
        let splitter = ColumnSplitter::new(&ColumnSplit::Delimiter { delimiter: '|' }).unwrap();
        assert_eq!(splitter.split(" x | y |z "), vec!["x", "y", "z"]);

        let splitter = ColumnSplitter::new(&ColumnSplit::Pattern {
            pattern: r"\s*;\s*".to_string(),
        })
        .unwrap();
        assert_eq!(splitter.split("1 ; 2;3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_whole_line_and_blank_lines() {
        let splitter = ColumnSplitter::new(&ColumnSplit::WholeLine).unwrap();
        let rows = splitter.split_text("first  line\n\n   \nsecond");
        assert_eq!(rows, vec![vec!["first  line"], vec!["second"]]);
    }

    #[test]
    fn test_bad_pattern_is_config_error() {
        let result = ColumnSplitter::new(&ColumnSplit::Pattern {
            pattern: "[".to_string(),
        });
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
