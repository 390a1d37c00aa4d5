use crate::config::ScanConfig;
use regex::Regex;
use std::path::Path;
use tracing::warn;

pub struct FileFilter {
    input_extensions: Vec<String>,
    exclude_dirs: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(config: &ScanConfig) -> Self {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(regex) => Some(regex),
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "ignoring invalid exclude pattern");
                    None
                }
            })
            .collect();

        Self {
            input_extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_dirs: config.exclude_dirs.clone(),
            exclude_patterns,
        }
    }

    /// Extension match is case-insensitive, so `REPORT.PDF` counts.
    pub fn is_input_file(&self, path: &Path) -> bool {
        self.has_input_extension(path) && !self.matches_any_pattern(&path.to_string_lossy())
    }

    pub fn has_input_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| self.input_extensions.contains(&ext.to_lowercase()))
    }

    pub fn should_traverse_directory(&self, path: &Path) -> bool {
        if let Some(dir_name) = path.file_name().and_then(|s| s.to_str()) {
            let dir_name_lower = dir_name.to_lowercase();

            if self
                .exclude_dirs
                .iter()
                .any(|exclude| exclude.to_lowercase() == dir_name_lower)
            {
                return false;
            }

            let path_str = path.to_string_lossy();
            if self.exclude_patterns.iter().any(|p| p.is_match(&path_str)) {
                return false;
            }
        }

        true
    }

    pub fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(&ScanConfig::default())
    }
}
