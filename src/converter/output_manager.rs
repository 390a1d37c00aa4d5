use crate::config::OutputConfig;
use crate::error::{PdfTablesError, Result};
use crate::job::{BatchResult, ConversionTask, JobSource, TaskStatus};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Directory under the destination root holding the log and reports.
pub const METADATA_DIR: &str = ".pdf-tables";
pub const LOG_FILE_NAME: &str = "conversion.log";
pub const REPORT_JSON_NAME: &str = "batch_report.json";
pub const REPORT_TEXT_NAME: &str = "batch_report.txt";

/// Prepares the destination tree and writes the per-batch artifacts.
pub struct OutputManager {
    destination_root: PathBuf,
    log_path: PathBuf,
    write_report: bool,
}

impl OutputManager {
    pub fn new(destination_root: &Path, config: &OutputConfig) -> Self {
        let log_path = config
            .log_file
            .clone()
            .unwrap_or_else(|| destination_root.join(METADATA_DIR).join(LOG_FILE_NAME));

        Self {
            destination_root: destination_root.to_path_buf(),
            log_path,
            write_report: config.write_report,
        }
    }

    /// Create the destination root and metadata directory and make sure the
    /// root is writable. Any failure here is fatal for the job.
    pub fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.destination_root).map_err(|e| PdfTablesError::Permission {
            path: format!(
                "Cannot create output directory {}: {}",
                self.destination_root.display(),
                e
            ),
        })?;

        let metadata_dir = self.get_metadata_dir();
        fs::create_dir_all(&metadata_dir).map_err(|e| PdfTablesError::Permission {
            path: format!("Cannot create {}: {}", metadata_dir.display(), e),
        })?;

        let test_file = metadata_dir.join(".write_test");
        match File::create(&test_file) {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                return Err(PdfTablesError::Permission {
                    path: format!(
                        "No write permission for directory {}: {}",
                        self.destination_root.display(),
                        e
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn open_log(&self) -> Result<ConversionLog> {
        ConversionLog::open(&self.log_path)
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn get_metadata_dir(&self) -> PathBuf {
        self.destination_root.join(METADATA_DIR)
    }

    /// Write the JSON and text reports. Returns the paths written, empty
    /// when reports are disabled.
    pub fn write_reports(&self, result: &BatchResult) -> Result<Vec<PathBuf>> {
        if !self.write_report {
            return Ok(Vec::new());
        }

        Ok(vec![
            self.save_report_json(result)?,
            self.save_report_text(result)?,
        ])
    }

    fn save_report_json(&self, result: &BatchResult) -> Result<PathBuf> {
        let report_path = self.get_metadata_dir().join(REPORT_JSON_NAME);
        let json_content =
            serde_json::to_string_pretty(result).map_err(|e| PdfTablesError::Config {
                message: format!("Failed to serialize report to JSON: {}", e),
            })?;

        fs::write(&report_path, json_content)?;
        Ok(report_path)
    }

    fn save_report_text(&self, result: &BatchResult) -> Result<PathBuf> {
        let report_path = self.get_metadata_dir().join(REPORT_TEXT_NAME);
        let mut file = File::create(&report_path)?;

        writeln!(file, "PDF Tables Batch Report")?;
        writeln!(file, "=======================")?;
        writeln!(file)?;

        match result.job.source() {
            JobSource::Folder(root) => writeln!(file, "Source folder: {}", root.display())?,
            JobSource::Files(files) => writeln!(file, "Source files: {}", files.len())?,
        }
        writeln!(
            file,
            "Destination: {}",
            result.job.destination_root().display()
        )?;
        writeln!(
            file,
            "Started: {}",
            result.started_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(file, "Duration: {:?}", result.elapsed)?;
        if result.cancelled {
            writeln!(file, "Cancelled: yes")?;
        }
        writeln!(file)?;

        writeln!(file, "Summary:")?;
        writeln!(file, "  Total: {}", result.total)?;
        writeln!(file, "  Succeeded: {}", result.succeeded)?;
        writeln!(file, "  Failed: {}", result.failed)?;
        writeln!(file, "  Skipped: {}", result.skipped)?;
        writeln!(file)?;

        if result.failed > 0 {
            writeln!(file, "Failures:")?;
            for task in result.failures() {
                writeln!(
                    file,
                    "  - {}: {}",
                    task.display_name(),
                    task.error().unwrap_or("unknown error")
                )?;
            }
            writeln!(file)?;
        }

        writeln!(file, "Files:")?;
        for task in &result.tasks {
            match task.status() {
                TaskStatus::Succeeded => writeln!(
                    file,
                    "  [{}] {} -> {} ({} sheets, {} rows)",
                    task.status(),
                    task.display_name(),
                    task.destination.display(),
                    task.tables_written,
                    task.rows_written
                )?,
                status => writeln!(file, "  [{}] {}", status, task.display_name())?,
            }
        }

        Ok(report_path)
    }
}

/// Append-only record of task outcomes, one tab-separated line each:
/// `timestamp  status  source  [error]`.
pub struct ConversionLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl ConversionLog {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PdfTablesError::Permission {
                path: format!("Cannot create {}: {}", parent.display(), e),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PdfTablesError::Permission {
                path: format!("Cannot open log {}: {}", path.display(), e),
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, task: &ConversionTask) -> io::Result<()> {
        let line = Self::format_entry(Utc::now(), task);
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(file, "{}", line)?;
        file.flush()
    }

    pub fn format_entry(timestamp: DateTime<Utc>, task: &ConversionTask) -> String {
        let mut line = format!(
            "{}\t{}\t{}",
            timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            task.status(),
            task.source.display()
        );
        if let Some(error) = task.error() {
            line.push('\t');
            line.push_str(&error.replace(['\t', '\n'], " "));
        }
        line
    }
}
