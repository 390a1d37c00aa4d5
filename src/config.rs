use crate::error::{PdfTablesError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScanConfig {
    pub extensions: Vec<String>,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Unlimited when unset.
    pub max_depth: Option<usize>,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractionConfig {
    pub layout: TableLayout,
    pub infer_numeric: bool,
    /// Horizontal gap, in average glyph widths, that separates two cells.
    pub column_gap: usize,
    pub min_columns: usize,
    pub min_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TableLayout {
    /// One worksheet per detected table.
    SheetPerTable,
    /// Every table of a document concatenated into a single worksheet.
    Merged,
}

impl std::fmt::Display for TableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableLayout::SheetPerTable => write!(f, "sheet-per-table"),
            TableLayout::Merged => write!(f, "merged"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub destination: PathBuf,
    pub output_extension: String,
    pub nest_under_source_name: bool,
    pub write_report: bool,
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    /// 0 means one worker per CPU.
    pub workers: usize,
    /// Per-task extraction limit in seconds; 0 disables it.
    pub task_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["pdf".to_string()],
            exclude_dirs: vec![],
            exclude_patterns: vec![],
            max_depth: None,
            follow_links: false,
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            layout: TableLayout::SheetPerTable,
            infer_numeric: true,
            column_gap: 2,
            min_columns: 2,
            min_rows: 2,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("converted"),
            output_extension: "xlsx".to_string(),
            nest_under_source_name: false,
            write_report: true,
            log_file: None,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            task_timeout_secs: 300, // 5 minutes
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
            file: None,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(PdfTablesError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| PdfTablesError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| PdfTablesError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["pdf-tables.toml", ".pdf-tables.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref destination) = cli_args.destination {
            self.output.destination = destination.clone();
        }

        if let Some(layout) = cli_args.layout {
            self.extraction.layout = layout;
        }

        if let Some(workers) = cli_args.workers {
            self.batch.workers = workers;
        }

        if let Some(timeout) = cli_args.task_timeout_secs {
            self.batch.task_timeout_secs = timeout;
        }

        if cli_args.no_numeric {
            self.extraction.infer_numeric = false;
        }

        if let Some(nest) = cli_args.nest_under_source_name {
            self.output.nest_under_source_name = nest;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| PdfTablesError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| PdfTablesError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.extensions.is_empty() {
            return Err(PdfTablesError::Config {
                message: "At least one input extension must be specified".to_string(),
            });
        }

        if self.scan.max_depth == Some(0) {
            return Err(PdfTablesError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        if self.extraction.column_gap == 0 {
            return Err(PdfTablesError::Config {
                message: "Column gap must be at least 1 glyph width".to_string(),
            });
        }

        if self.extraction.min_columns < 2 {
            return Err(PdfTablesError::Config {
                message: "A table needs at least 2 columns (min_columns >= 2)".to_string(),
            });
        }

        if self.extraction.min_rows == 0 {
            return Err(PdfTablesError::Config {
                message: "Minimum table rows must be greater than 0".to_string(),
            });
        }

        let ext = self.output.output_extension.trim_start_matches('.');
        if ext.is_empty() || ext.contains(['/', '\\']) {
            return Err(PdfTablesError::Config {
                message: format!("Invalid output extension: {:?}", self.output.output_extension),
            });
        }

        Ok(())
    }

    /// Worker count with `0` resolved to the number of CPUs.
    pub fn effective_workers(&self) -> usize {
        if self.batch.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.batch.workers
        }
    }

    pub fn task_timeout(&self) -> Option<Duration> {
        match self.batch.task_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub destination: Option<PathBuf>,
    pub layout: Option<TableLayout>,
    pub workers: Option<usize>,
    pub task_timeout_secs: Option<u64>,
    pub no_numeric: bool,
    pub nest_under_source_name: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_destination(mut self, destination: Option<PathBuf>) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_layout(mut self, layout: Option<TableLayout>) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<u64>) -> Self {
        self.task_timeout_secs = timeout;
        self
    }

    pub fn with_no_numeric(mut self, no_numeric: bool) -> Self {
        self.no_numeric = no_numeric;
        self
    }

    pub fn with_nest_under_source_name(mut self, nest: Option<bool>) -> Self {
        self.nest_under_source_name = nest;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scan.extensions, vec!["pdf"]);
        assert_eq!(config.extraction.layout, TableLayout::SheetPerTable);
        assert!(config.extraction.infer_numeric);
        assert!(config.scan.exclude_dirs.is_empty());
        assert_eq!(config.scan.max_depth, None);
        assert_eq!(config.batch.workers, 1);
        assert_eq!(config.task_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.scan.extensions.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.extraction.min_columns = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.output_extension = "../x".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.max_depth = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = Config::default();
        config.extraction.layout = TableLayout::Merged;
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();

        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.extraction.layout, TableLayout::Merged);
        assert_eq!(loaded_config.batch.task_timeout_secs, 300);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [batch]
            workers = 4
            task_timeout_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.effective_workers(), 4);
        assert_eq!(config.task_timeout(), None);
        assert_eq!(config.scan.extensions, vec!["pdf"]);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();

        let overrides = CliOverrides::new()
            .with_destination(Some(PathBuf::from("out")))
            .with_layout(Some(TableLayout::Merged))
            .with_task_timeout(Some(10))
            .with_no_numeric(true);

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.output.destination, PathBuf::from("out"));
        assert_eq!(config.extraction.layout, TableLayout::Merged);
        assert_eq!(config.batch.task_timeout_secs, 10);
        assert!(!config.extraction.infer_numeric);
    }

    #[test]
    fn test_zero_workers_means_all_cpus() {
        let mut config = Config::default();
        config.batch.workers = 0;
        assert!(config.effective_workers() >= 1);
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_file = NamedTempFile::new().unwrap();
        Config::default().save_to_file(temp_file.path()).unwrap();

        let sample = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(sample.contains("[scan]"));
        assert!(sample.contains("[extraction]"));
        assert!(sample.contains("layout = \"sheet-per-table\""));
        assert!(sample.contains("[batch]"));
    }
}
