//! Extracted tables and the two adapter seams the batch driver depends on.

pub mod detect;
pub mod pdf_extractor;
pub mod xlsx_writer;

pub use detect::{Glyph, TableDetector};
pub use pdf_extractor::PdfTableExtractor;
pub use xlsx_writer::XlsxTableWriter;

use crate::error::ConversionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Called with `(page, pages)` after each page has been processed.
pub type PageCallback<'a> = &'a mut dyn FnMut(u32, u32);

/// Pulls tables out of one input file.
pub trait TableExtractor: Send + Sync {
    fn extract(&self, path: &Path, on_page: PageCallback<'_>)
        -> Result<Vec<Table>, ConversionError>;
}

/// Persists tables to one destination file, creating parent directories.
pub trait TableWriter: Send + Sync {
    fn write(&self, tables: &[Table], destination: &Path) -> Result<WriteSummary, ConversionError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    pub sheets: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

/// A rectangular block of text cells found on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub page: u32,
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from raw rows. The first row becomes the header when it
    /// has more than one cell; short rows are padded to the widest row.
    pub fn from_rows(page: u32, mut rows: Vec<Vec<String>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }

        let header = if rows.first().map_or(false, |first| first.len() > 1) {
            Some(rows.remove(0))
        } else {
            None
        };

        Self { page, header, rows }
    }

    pub fn width(&self) -> usize {
        self.header
            .as_ref()
            .map(Vec::len)
            .into_iter()
            .chain(self.rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.rows.is_empty()
    }

    /// Numeric when every non-empty body cell is a number and at least one
    /// cell is non-empty.
    pub fn column_kinds(&self) -> Vec<ColumnKind> {
        (0..self.width())
            .map(|col| {
                let mut values = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .peekable();

                if values.peek().is_none() {
                    return ColumnKind::Text;
                }

                if values.all(|v| parse_number(v).is_some()) {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                }
            })
            .collect()
    }

    /// Body rows with cells typed per column. With `infer_numeric` off every
    /// non-empty cell stays text.
    pub fn typed_rows(&self, infer_numeric: bool) -> Vec<Vec<Cell>> {
        let kinds = if infer_numeric {
            self.column_kinds()
        } else {
            vec![ColumnKind::Text; self.width()]
        };

        self.rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(col, raw)| {
                        let value = raw.trim();
                        if value.is_empty() {
                            return Cell::Empty;
                        }
                        match kinds.get(col) {
                            Some(ColumnKind::Numeric) => parse_number(value)
                                .map(Cell::Number)
                                .unwrap_or_else(|| Cell::Text(value.to_string())),
                            _ => Cell::Text(value.to_string()),
                        }
                    })
                    .collect()
            })
            .collect()
    }

    /// Concatenate tables into one. The first header wins; a later table's
    /// header row is kept as data unless it repeats that header.
    pub fn merge(tables: Vec<Table>) -> Option<Table> {
        let mut iter = tables.into_iter();
        let mut merged = iter.next()?;

        for table in iter {
            if let Some(header) = table.header {
                if merged.header.as_ref() != Some(&header) {
                    merged.rows.push(header);
                }
            }
            merged.rows.extend(table.rows);
        }

        let width = merged.width();
        if let Some(header) = merged.header.as_mut() {
            header.resize(width, String::new());
        }
        for row in &mut merged.rows {
            row.resize(width, String::new());
        }

        Some(merged)
    }
}

/// Plain decimal or scientific numbers only. Words like `inf` or `NaN`
/// stay text.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        || !value.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
