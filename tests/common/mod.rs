#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::fs;
use std::path::Path;

/// Write a PDF whose pages contain the given lines, one text object per
/// line. Cells of a table row are separated by runs of spaces.
pub fn write_pdf(path: &Path, pages: &[Vec<&str>]) {
    let pages: Vec<Vec<(i64, i64, &str)>> = pages
        .iter()
        .map(|lines| {
            lines
                .iter()
                .enumerate()
                .map(|(i, line)| (40, 780 - (i as i64) * 14, *line))
                .collect()
        })
        .collect();
    write_positioned_pdf(path, &pages);
}

/// One page where every cell of every row is its own text object, placed
/// with its own `Td` and no padding spaces.
pub fn write_cell_grid_pdf(path: &Path, rows: &[&[&str]]) {
    let mut texts = Vec::new();
    for (row, cells) in rows.iter().enumerate() {
        let y = 780 - (row as i64) * 14;
        for (col, cell) in cells.iter().enumerate() {
            texts.push((40 + (col as i64) * 150, y, *cell));
        }
    }
    write_positioned_pdf(path, &[texts]);
}

/// Write a PDF from `(x, y, text)` placements, one page per entry.
pub fn write_positioned_pdf(path: &Path, pages: &[Vec<(i64, i64, &str)>]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for texts in pages {
        let mut operations = Vec::new();
        for &(x, y, text) in texts {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new("Td", vec![x.into(), y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(text)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(path).unwrap();
}

/// One page holding a two-column price table.
pub fn write_price_pdf(path: &Path) {
    write_pdf(
        path,
        &[vec![
            "Price list",
            "Item      Price",
            "Tea       123.45",
            "Coffee    7",
        ]],
    );
}

/// A PDF with prose only.
pub fn write_prose_pdf(path: &Path) {
    write_pdf(
        path,
        &[vec!["This document has no tables.", "Only a sentence or two."]],
    );
}

pub fn write_corrupt_pdf(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"%PDF-1.4\nthis is not a real pdf body").unwrap();
}
