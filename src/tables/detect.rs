use crate::config::ExtractionConfig;
use crate::tables::Table;

/// One positioned piece of page text, in PDF points with `top` growing
/// downwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Glyph {
    pub fn new(text: impl Into<String>, x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    fn width(&self) -> f64 {
        (self.x1 - self.x0).max(0.0)
    }

    fn height(&self) -> f64 {
        (self.bottom - self.top).max(0.0)
    }

    fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Finds tables in the positioned glyphs of a page.
///
/// Glyphs sharing a baseline form a line. A line is split into cells
/// wherever the horizontal gap between two glyphs is at least `column_gap`
/// average glyph widths, so it does not matter whether a cell was drawn by
/// its own text operator or padded with spaces. Consecutive lines with at
/// least `min_columns` cells form a block, and a block with at least
/// `min_rows` lines is a table.
#[derive(Debug, Clone)]
pub struct TableDetector {
    column_gap: f64,
    min_columns: usize,
    min_rows: usize,
}

impl TableDetector {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            column_gap: config.column_gap.max(1) as f64,
            min_columns: config.min_columns.max(2),
            min_rows: config.min_rows.max(1),
        }
    }

    pub fn detect(&self, page: u32, glyphs: &[Glyph]) -> Vec<Table> {
        let mut tables = Vec::new();
        let mut block: Vec<Vec<String>> = Vec::new();

        for cells in self.rows(glyphs) {
            if cells.len() >= self.min_columns {
                block.push(cells);
            } else {
                self.flush(page, &mut block, &mut tables);
            }
        }
        self.flush(page, &mut block, &mut tables);

        tables
    }

    /// Whether a table found by ruling lines is big enough to keep.
    pub fn accepts(&self, rows: &[Vec<String>]) -> bool {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        width >= self.min_columns
            && rows.len() >= self.min_rows
            && rows.iter().flatten().any(|cell| !cell.is_empty())
    }

    fn flush(&self, page: u32, block: &mut Vec<Vec<String>>, tables: &mut Vec<Table>) {
        if block.len() >= self.min_rows {
            tables.push(Table::from_rows(page, std::mem::take(block)));
        } else {
            block.clear();
        }
    }

    /// Cell texts of every text line on the page, top to bottom.
    pub fn rows(&self, glyphs: &[Glyph]) -> Vec<Vec<String>> {
        let mut visible: Vec<&Glyph> = glyphs.iter().filter(|g| !g.is_blank()).collect();
        visible.sort_by(|a, b| a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0)));

        let mut lines: Vec<Vec<&Glyph>> = Vec::new();
        for glyph in visible {
            match lines.last_mut() {
                Some(line) if same_line(line[0], glyph) => line.push(glyph),
                _ => lines.push(vec![glyph]),
            }
        }

        lines
            .into_iter()
            .map(|mut line| {
                line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
                self.split_line(&line)
            })
            .collect()
    }

    fn split_line(&self, line: &[&Glyph]) -> Vec<String> {
        let widths: Vec<f64> = line.iter().map(|g| g.width()).filter(|w| *w > 0.0).collect();
        let average = if widths.is_empty() {
            line.first().map_or(1.0, |g| (g.height() / 2.0).max(1.0))
        } else {
            widths.iter().sum::<f64>() / widths.len() as f64
        };

        let mut cells = Vec::new();
        let mut current = String::new();
        let mut right_edge: Option<f64> = None;

        for glyph in line {
            if let Some(edge) = right_edge {
                let gap = glyph.x0 - edge;
                if gap >= self.column_gap * average {
                    push_cell(&mut cells, &mut current);
                } else if gap > average * 0.25 && !current.is_empty() {
                    current.push(' ');
                }
            }
            current.push_str(&glyph.text.replace('\u{a0}', " "));
            right_edge = Some(right_edge.map_or(glyph.x1, |edge| edge.max(glyph.x1)));
        }
        push_cell(&mut cells, &mut current);

        cells
    }
}

fn same_line(first: &Glyph, glyph: &Glyph) -> bool {
    (glyph.top - first.top).abs() <= first.height().max(1.0) / 2.0
}

fn push_cell(cells: &mut Vec<String>, current: &mut String) {
    let cell = current.trim();
    if !cell.is_empty() {
        cells.push(cell.to_string());
    }
    current.clear();
}

impl Default for TableDetector {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}
