pub mod cli;
pub mod config;
pub mod converter;
pub mod error;
pub mod job;
pub mod logging;
pub mod scanner;
pub mod tables;
pub mod ui;

// Public API re-exports
pub use cli::{Cli, Layout, OutputFormat};
pub use config::{CliOverrides, Config, TableLayout};
pub use error::{ConversionError, PdfTablesError, Result, UserFriendlyError};
pub use job::{BatchResult, ConversionJob, ConversionTask, JobSource, TaskStatus};

// Core functionality re-exports
pub use converter::{BatchDriver, ConversionLog, OutputManager, ProgressEvent};
pub use scanner::{FileFilter, PdfFile, PdfScanner};
pub use tables::{PdfTableExtractor, Table, TableExtractor, TableWriter, XlsxTableWriter};
pub use ui::signals::CancellationToken;
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};

use std::path::Path;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

/// Application front end: wires configuration, the batch driver, progress
/// display and reports together.
pub struct PdfTables {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl PdfTables {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Instance without a Ctrl+C handler, so several can coexist in tests.
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(false);
        let shutdown = GracefulShutdown::new_for_test();

        Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        }
    }

    /// Driver configured from this instance's settings and wired to its
    /// cancellation flag.
    pub fn driver(&self) -> BatchDriver {
        BatchDriver::new(&self.config).with_cancellation(self.shutdown.token())
    }

    /// Tasks a job would run, without converting anything.
    pub fn plan(&self, job: &ConversionJob) -> Result<Vec<ConversionTask>> {
        self.driver().enumerate(job)
    }

    /// Convert every PDF of `job`. Per-file failures are reported in the
    /// result; an error means nothing was converted.
    pub async fn convert(&self, job: ConversionJob) -> Result<BatchResult> {
        self.shutdown.check_shutdown()?;

        self.output_formatter.start_operation("Scanning for PDF files");
        let driver = self.driver();
        let tasks = driver.enumerate(&job)?;

        if tasks.is_empty() {
            return Err(PdfTablesError::NoPdfFound {
                searched_extensions: self.config.scan.extensions.clone(),
            });
        }

        self.output_formatter
            .info(&format!("Found {} PDF file(s)", tasks.len()));
        if job.is_folder_job() {
            let stats = driver.scanner().get_statistics(&tasks);
            debug!("{}", stats.display_summary());
        }

        let output_manager = OutputManager::new(job.destination_root(), &self.config.output);
        output_manager.initialize()?;
        let log = Arc::new(output_manager.open_log()?);
        let driver = driver.with_log(Arc::clone(&log));

        self.output_formatter.start_operation("Converting tables");
        let file_progress = self.progress_manager.create_file_progress(tasks.len() as u64);

        let pb = file_progress.clone();
        let result = task::spawn_blocking(move || {
            let on_progress = move |event: &ProgressEvent| {
                ui::progress::update_file_progress(&pb, event);
            };
            driver.run_tasks(&job, tasks, Some(&on_progress))
        })
        .await
        .map_err(|e| PdfTablesError::Task {
            message: format!("Conversion task failed: {}", e),
        })??;

        ui::progress::finish_progress_with_summary(
            &file_progress,
            &format!("Converted {}/{} files", result.succeeded, result.total),
            result.elapsed,
        );

        match output_manager.write_reports(&result) {
            Ok(paths) => {
                for path in paths {
                    self.output_formatter
                        .info(&format!("Report written to {}", path.display()));
                }
            }
            Err(e) => {
                warn!(error = %e, "batch report not written");
                self.output_formatter
                    .warning(&format!("Batch report not written: {}", e.user_message()));
            }
        }
        self.output_formatter
            .info(&format!("Conversion log: {}", log.path().display()));

        self.output_formatter.print_batch_summary(&result);

        Ok(result)
    }

    /// Write a sample configuration file.
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &PdfTablesError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn output_mode_for(format: &OutputFormat) -> OutputMode {
    match format {
        OutputFormat::Human => OutputMode::Human,
        OutputFormat::Json => OutputMode::Json,
        OutputFormat::Plain => OutputMode::Plain,
    }
}

/// Convert a folder with default settings and no console output.
pub async fn convert_folder_simple(folder: &Path, destination: &Path) -> Result<BatchResult> {
    let app = PdfTables::new_for_test(Config::default(), OutputMode::Plain, 0, true);
    app.convert(ConversionJob::folder(folder, destination)).await
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown"),
        build_date: option_env!("BUILD_DATE").unwrap_or("unknown"),
        target: std::env::consts::ARCH.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_date: &'static str,
    pub target: String,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pdf-tables {} ({}) built on {} for {}",
            self.version, self.git_hash, self.build_date, self.target
        )
    }
}
