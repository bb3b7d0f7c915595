//! Text preparation for slide content.
//!
//! Turns record fields into the paragraph lines written into shapes:
//! line endings are normalized, whitespace runs collapsed, lines trimmed
//! and blank lines dropped.

use crate::types::{Table, TextFragment};
use regex::Regex;
use std::sync::LazyLock;

/// Regex to collapse runs of spaces and tabs into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

/// Separator placed between table cells when a table is rendered as text.
pub const CELL_SEPARATOR: &str = " | ";

/// Prepares record text for injection into slide shapes.
#[derive(Debug, Clone)]
pub struct TextPreparer {
    /// Whether runs of whitespace inside a line are collapsed.
    collapse_whitespace: bool,
}

impl Default for TextPreparer {
    fn default() -> Self {
        Self {
            collapse_whitespace: true,
        }
    }
}

impl TextPreparer {
    /// Create a preparer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether whitespace runs inside a line are collapsed.
    pub fn with_collapse_whitespace(mut self, collapse: bool) -> Self {
        self.collapse_whitespace = collapse;
        self
    }

    /// Normalize a single line: collapse whitespace runs and trim.
    pub fn normalize_line(&self, line: &str) -> String {
        if self.collapse_whitespace {
            WHITESPACE_COLLAPSE_REGEX
                .replace_all(line, " ")
                .trim()
                .to_string()
        } else {
            line.trim().to_string()
        }
    }

    /// Split text into non-empty normalized lines.
    pub fn lines(&self, text: &str) -> Vec<String> {
        text.replace("\r\n", "\n")
            .replace('\r', "\n")
            .split('\n')
            .map(|l| self.normalize_line(l))
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// A single-line field (title, header, label); `None` when blank.
    ///
    /// Embedded line breaks are kept so a title can span paragraphs.
    pub fn field(&self, text: &str) -> Option<Vec<String>> {
        let lines = self.lines(text);
        if lines.is_empty() {
            None
        } else {
            Some(lines)
        }
    }

    /// Body lines: one paragraph per non-empty line of every fragment, in
    /// fragment order.
    pub fn body(&self, fragments: &[TextFragment]) -> Vec<String> {
        fragments.iter().flat_map(|f| self.lines(&f.text)).collect()
    }

    /// Table rows rendered as text, one line per non-empty row.
    pub fn table(&self, table: &Table) -> Vec<String> {
        table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| self.lines(cell).join(" "))
                    .collect::<Vec<_>>()
                    .join(CELL_SEPARATOR)
            })
            .filter(|row| !row.replace(CELL_SEPARATOR.trim(), "").trim().is_empty())
            .collect()
    }
}
