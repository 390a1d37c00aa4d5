mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn pdf_tables() -> Command {
    Command::cargo_bin("pdf-tables").unwrap()
}

#[test]
fn test_help() {
    pdf_tables()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--output"))
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_no_arguments_fails() {
    pdf_tables().assert().failure();
}

#[test]
fn test_folder_conversion_succeeds() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    common::write_price_pdf(&source.path().join("reports/prices.pdf"));

    pdf_tables()
        .arg(source.path())
        .arg("-o")
        .arg(dest.path())
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Succeeded: 1"));

    assert!(dest.path().join("reports/prices.xlsx").exists());
    assert!(dest.path().join(".pdf-tables/conversion.log").exists());
}

#[test]
fn test_partial_failure_exit_code() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    common::write_price_pdf(&source.path().join("good.pdf"));
    common::write_corrupt_pdf(&source.path().join("broken.pdf"));

    pdf_tables()
        .arg(source.path())
        .arg("-o")
        .arg(dest.path())
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("FAILED:"))
        .stderr(predicate::str::contains("broken.pdf"));

    assert!(dest.path().join("good.xlsx").exists());
    assert!(!dest.path().join("broken.xlsx").exists());
}

#[test]
fn test_missing_file_is_reported_as_failure() {
    let dest = TempDir::new().unwrap();

    pdf_tables()
        .arg(dest.path().join("nowhere.pdf"))
        .arg("-o")
        .arg(dest.path())
        .arg("--output-format")
        .arg("plain")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere.pdf"));
}

#[test]
fn test_empty_folder_exit_code() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    fs::write(source.path().join("notes.txt"), "no pdfs here").unwrap();

    pdf_tables()
        .arg(source.path())
        .arg("-o")
        .arg(dest.path())
        .assert()
        .code(6);
}

#[test]
fn test_folder_mixed_with_files_is_invalid() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    let pdf = source.path().join("a.pdf");
    common::write_price_pdf(&pdf);

    pdf_tables()
        .arg(source.path())
        .arg(&pdf)
        .arg("-o")
        .arg(dest.path())
        .assert()
        .code(3);
}

#[test]
fn test_dry_run_writes_nothing() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    common::write_price_pdf(&source.path().join("prices.pdf"));
    let out = dest.path().join("out");

    pdf_tables()
        .arg(source.path())
        .arg("-o")
        .arg(&out)
        .arg("--dry-run")
        .arg("--output-format")
        .arg("plain")
        .assert()
        .success()
        .stdout(predicate::str::contains("prices.xlsx"));

    assert!(!out.exists());
}

#[test]
fn test_generate_config() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("custom.toml");

    pdf_tables()
        .arg("--generate-config")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[extraction]"));

    pdf_tables()
        .current_dir(temp.path())
        .arg("--generate-config")
        .assert()
        .success();
    assert!(temp.path().join("pdf-tables.toml").exists());
}

#[test]
fn test_json_summary() {
    let source = TempDir::new().unwrap();
    let dest = TempDir::new().unwrap();
    common::write_price_pdf(&source.path().join("a.pdf"));
    common::write_prose_pdf(&source.path().join("b.pdf"));

    let output = pdf_tables()
        .arg(source.path())
        .arg("-o")
        .arg(dest.path())
        .arg("--output-format")
        .arg("json")
        .arg("-q")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["total"], 2);
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failures"][0]["error"], "no tabular data found");
}
