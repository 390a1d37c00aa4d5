use crate::config::ExtractionConfig;
use crate::error::ConversionError;
use crate::tables::{Glyph, PageCallback, Table, TableDetector, TableExtractor};
use pdfplumber::{Page, Pdf, TableSettings};
use std::path::Path;
use tracing::{debug, warn};

/// Reads PDFs with pdfplumber. Ruled tables come from its table finder;
/// pages without ruling lines fall back to the glyph-position detector.
#[derive(Debug, Clone, Default)]
pub struct PdfTableExtractor {
    detector: TableDetector,
}

impl PdfTableExtractor {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            detector: TableDetector::new(config),
        }
    }

    fn open(&self, path: &Path) -> Result<Pdf, ConversionError> {
        if !path.exists() {
            return Err(ConversionError::Input(format!(
                "file not found: {}",
                path.display()
            )));
        }

        Pdf::open_file(path, None)
            .map_err(|e| ConversionError::Extraction(format!("cannot read PDF: {e}")))
    }

    fn page_tables(&self, number: u32, page: &Page) -> Vec<Table> {
        let ruled: Vec<Table> = page
            .find_tables(&TableSettings::default())
            .iter()
            .map(|table| {
                table
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|c| c.text.as_deref().unwrap_or("").trim().to_string())
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|rows| self.detector.accepts(rows))
            .map(|rows| Table::from_rows(number, rows))
            .collect();

        if !ruled.is_empty() {
            return ruled;
        }

        let glyphs: Vec<Glyph> = page
            .chars()
            .iter()
            .map(|ch| {
                Glyph::new(
                    ch.text.to_string(),
                    f64::from(ch.bbox.x0),
                    f64::from(ch.bbox.top),
                    f64::from(ch.bbox.x1),
                    f64::from(ch.bbox.bottom),
                )
            })
            .collect();
        self.detector.detect(number, &glyphs)
    }
}

impl TableExtractor for PdfTableExtractor {
    fn extract(&self, path: &Path, on_page: PageCallback<'_>) -> Result<Vec<Table>, ConversionError> {
        let pdf = self.open(path)?;
        let pages = u32::try_from(pdf.page_count()).unwrap_or(u32::MAX);
        if pages == 0 {
            return Err(ConversionError::Extraction(
                "document has no pages".to_string(),
            ));
        }

        let mut tables = Vec::new();
        for (number, page) in (1..=pages).zip(pdf.pages_iter()) {
            // A single unreadable page should not cost the whole document.
            match page {
                Ok(page) => {
                    let found = self.page_tables(number, &page);
                    debug!(
                        file = %path.display(),
                        page = number,
                        tables = found.len(),
                        "page scanned"
                    );
                    tables.extend(found);
                }
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        page = number,
                        "could not read page: {}",
                        e
                    );
                }
            }
            on_page(number, pages);
        }

        Ok(tables)
    }
}
