use crate::config::TableLayout;
use crate::error::ConversionError;
use crate::tables::{Cell, Table, TableWriter, WriteSummary};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Name of the single worksheet written in merged layout.
pub const MERGED_SHEET_NAME: &str = "Tables";

/// Writes tables into an `.xlsx` workbook.
#[derive(Debug, Clone)]
pub struct XlsxTableWriter {
    layout: TableLayout,
    infer_numeric: bool,
}

impl XlsxTableWriter {
    pub fn new(layout: TableLayout, infer_numeric: bool) -> Self {
        Self {
            layout,
            infer_numeric,
        }
    }

    pub fn sheet_name(index: usize) -> String {
        format!("Table {}", index + 1)
    }

    fn build_workbook(&self, tables: &[Table]) -> Result<(Workbook, WriteSummary), ConversionError> {
        let mut workbook = Workbook::new();
        let mut summary = WriteSummary::default();

        let sheets: Vec<(String, Table)> = match self.layout {
            TableLayout::SheetPerTable => tables
                .iter()
                .enumerate()
                .map(|(i, t)| (Self::sheet_name(i), t.clone()))
                .collect(),
            TableLayout::Merged => Table::merge(tables.to_vec())
                .map(|t| vec![(MERGED_SHEET_NAME.to_string(), t)])
                .unwrap_or_default(),
        };

        for (name, table) in &sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(name)?;
            summary.rows += self.fill_sheet(worksheet, table)?;
            summary.sheets += 1;
        }

        Ok((workbook, summary))
    }

    fn fill_sheet(&self, worksheet: &mut Worksheet, table: &Table) -> Result<usize, ConversionError> {
        let bold = Format::new().set_bold();
        let mut row_index: u32 = 0;

        if let Some(header) = &table.header {
            for (col, title) in header.iter().enumerate() {
                if !title.is_empty() {
                    worksheet.write_string_with_format(row_index, column(col)?, title, &bold)?;
                }
            }
            row_index += 1;
        }

        let rows = table.typed_rows(self.infer_numeric);
        for cells in &rows {
            for (col, cell) in cells.iter().enumerate() {
                match cell {
                    Cell::Empty => {}
                    Cell::Number(value) => {
                        worksheet.write_number(row_index, column(col)?, *value)?;
                    }
                    Cell::Text(text) => {
                        worksheet.write_string(row_index, column(col)?, text)?;
                    }
                }
            }
            row_index += 1;
        }

        Ok(rows.len())
    }
}

fn column(index: usize) -> Result<u16, ConversionError> {
    u16::try_from(index)
        .map_err(|_| ConversionError::Write(format!("too many columns ({})", index + 1)))
}

impl Default for XlsxTableWriter {
    fn default() -> Self {
        Self::new(TableLayout::SheetPerTable, true)
    }
}

impl TableWriter for XlsxTableWriter {
    fn write(&self, tables: &[Table], destination: &Path) -> Result<WriteSummary, ConversionError> {
        let (mut workbook, summary) = self.build_workbook(tables)?;
        let buffer = workbook.save_to_buffer()?;

        let parent = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| {
            ConversionError::Write(format!("cannot create {}: {}", parent.display(), e))
        })?;

        // Stage next to the destination so the final rename stays on one
        // filesystem and a half-written workbook is never visible.
        let mut staged = tempfile::Builder::new()
            .prefix(".pdf-tables-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| ConversionError::Write(format!("cannot stage output: {}", e)))?;
        staged
            .write_all(&buffer)
            .and_then(|_| staged.flush())
            .map_err(|e| ConversionError::Write(e.to_string()))?;
        staged.persist(destination).map_err(|e| {
            ConversionError::Write(format!("cannot write {}: {}", destination.display(), e.error))
        })?;

        debug!(
            destination = %destination.display(),
            sheets = summary.sheets,
            rows = summary.rows,
            "workbook written"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook, Data, Reader, Xlsx};
    use tempfile::TempDir;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn sample_tables() -> Vec<Table> {
        vec![
            Table::from_rows(1, vec![row(&["Item", "Price"]), row(&["Tea", "123.45"])]),
            Table::from_rows(2, vec![row(&["Item", "Price"]), row(&["Milk", "0.99"])]),
        ]
    }

    #[test]
    fn test_sheet_per_table_layout() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("nested").join("out.xlsx");

        let summary = XlsxTableWriter::default()
            .write(&sample_tables(), &dest)
            .unwrap();
        assert_eq!(summary, WriteSummary { sheets: 2, rows: 2 });

        let mut workbook: Xlsx<_> = open_workbook(&dest).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Table 1", "Table 2"]);

        let range = workbook.worksheet_range("Table 1").unwrap();
        assert_eq!(range.get_value((0, 0)), Some(&Data::String("Item".into())));
        assert_eq!(range.get_value((1, 1)), Some(&Data::Float(123.45)));
    }

    #[test]
    fn test_merged_layout() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("merged.xlsx");

        let summary = XlsxTableWriter::new(TableLayout::Merged, true)
            .write(&sample_tables(), &dest)
            .unwrap();
        assert_eq!(summary, WriteSummary { sheets: 1, rows: 2 });

        let mut workbook: Xlsx<_> = open_workbook(&dest).unwrap();
        assert_eq!(workbook.sheet_names(), vec![MERGED_SHEET_NAME]);
        let range = workbook.worksheet_range(MERGED_SHEET_NAME).unwrap();
        assert_eq!(range.get_value((2, 0)), Some(&Data::String("Milk".into())));
        assert_eq!(range.get_value((2, 1)), Some(&Data::Float(0.99)));
    }

    #[test]
    fn test_text_mode_keeps_strings() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("text.xlsx");

        XlsxTableWriter::new(TableLayout::SheetPerTable, false)
            .write(&sample_tables()[..1], &dest)
            .unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&dest).unwrap();
        let range = workbook.worksheet_range("Table 1").unwrap();
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("123.45".into())));
    }

    #[test]
    fn test_overwrites_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("out.xlsx");
        std::fs::write(&dest, b"stale").unwrap();

        XlsxTableWriter::default()
            .write(&sample_tables(), &dest)
            .unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(open_workbook::<Xlsx<_>, _>(&dest).is_ok());
    }
}
