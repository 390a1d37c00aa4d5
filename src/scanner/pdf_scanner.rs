use crate::config::ScanConfig;
use crate::converter::output_manager::METADATA_DIR;
use crate::error::{PdfTablesError, Result};
use crate::job::{ConversionJob, ConversionTask, JobSource};
use crate::scanner::file_filter::FileFilter;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone)]
pub struct PdfFile {
    pub source_path: PathBuf,
    pub relative_path: PathBuf,
    pub filename: String,
}

impl PdfFile {
    pub fn new(source_path: PathBuf, relative_path: PathBuf) -> Self {
        let filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_string();

        Self {
            source_path,
            relative_path,
            filename,
        }
    }
}

pub struct PdfScanner {
    filter: FileFilter,
    max_depth: Option<usize>,
    follow_links: bool,
    output_extension: String,
}

impl PdfScanner {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            filter: FileFilter::new(config),
            max_depth: config.max_depth,
            follow_links: config.follow_links,
            output_extension: "xlsx".to_string(),
        }
    }

    pub fn with_output_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.output_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    /// Expand a job into its tasks, in the order they will run.
    ///
    /// Explicit files are taken as given (missing or unsupported ones fail
    /// later, as tasks). Folder jobs keep only supported inputs, sorted by
    /// relative path.
    pub fn enumerate(&self, job: &ConversionJob) -> Result<Vec<ConversionTask>> {
        let root = job.destination_root();

        let tasks = match job.source() {
            JobSource::Files(files) => files
                .iter()
                .enumerate()
                .map(|(index, source)| {
                    let relative = source
                        .file_name()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from(sanitize_filename(&source.to_string_lossy())));
                    let destination = self.destination_for(root, &relative);
                    ConversionTask::new(index, source.clone(), relative, destination)
                })
                .collect(),
            JobSource::Folder(folder) => self
                .scan_directory_skipping(folder, &root.join(METADATA_DIR))?
                .into_iter()
                .enumerate()
                .map(|(index, pdf)| {
                    let destination = self.destination_for(root, &pdf.relative_path);
                    ConversionTask::new(index, pdf.source_path, pdf.relative_path, destination)
                })
                .collect(),
        };

        Ok(tasks)
    }

    pub fn destination_for(&self, destination_root: &Path, relative_path: &Path) -> PathBuf {
        destination_root
            .join(relative_path)
            .with_extension(&self.output_extension)
    }

    /// Walk `root`, leaving out the directory `skip` if it lies inside it.
    /// Used to keep a destination's own metadata folder out of the scan
    /// when the destination sits under the source.
    fn scan_directory_skipping(&self, root_path: &Path, skip: &Path) -> Result<Vec<PdfFile>> {
        if !root_path.exists() {
            return Err(PdfTablesError::InputNotFound {
                path: root_path.display().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(PdfTablesError::InvalidPath {
                path: format!("{} is not a directory", root_path.display()),
            });
        }

        let mut files = Vec::new();
        let skip = fs::canonicalize(skip).ok();

        let mut walker = WalkDir::new(root_path)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        if let Some(depth) = self.max_depth {
            walker = walker.max_depth(depth);
        }
        let walker = walker
            .into_iter()
            .filter_entry(|e| self.should_traverse(e, skip.as_deref()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    if err
                        .io_error()
                        .is_some_and(|e| e.kind() == std::io::ErrorKind::PermissionDenied)
                    {
                        warn!("permission denied while scanning: {}", err);
                    } else {
                        warn!("scan error: {}", err);
                    }
                    continue;
                }
            };

            if entry.file_type().is_file() {
                match self.process_file(&entry, root_path) {
                    Ok(Some(pdf)) => files.push(pdf),
                    Ok(None) => {}
                    Err(err) => warn!("skipping {}: {}", entry.path().display(), err),
                }
            }
        }

        // Deterministic order regardless of platform walk order.
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        debug!(count = files.len(), root = %root_path.display(), "scan finished");

        Ok(files)
    }

    fn should_traverse(&self, entry: &DirEntry, skip: Option<&Path>) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }

        if let Some(skip) = skip {
            if entry.file_name() == METADATA_DIR
                && fs::canonicalize(entry.path()).is_ok_and(|p| p == skip)
            {
                return false;
            }
        }

        self.filter.should_traverse_directory(entry.path())
    }

    fn process_file(&self, entry: &DirEntry, root_path: &Path) -> Result<Option<PdfFile>> {
        let path = entry.path();

        if !self.filter.is_input_file(path) {
            return Ok(None);
        }

        let relative_path = calculate_relative_path(path, root_path)?;
        Ok(Some(PdfFile::new(path.to_path_buf(), relative_path)))
    }

    /// Summary of an enumerated job. Sizes of unreadable sources count as 0.
    pub fn get_statistics(&self, tasks: &[ConversionTask]) -> ScanStatistics {
        let mut folders = std::collections::BTreeSet::new();
        let mut stats = ScanStatistics {
            total_files: tasks.len(),
            ..ScanStatistics::default()
        };

        for task in tasks {
            folders.insert(task.relative_path.parent().map(Path::to_path_buf).unwrap_or_default());

            let size = fs::metadata(&task.source).map(|m| m.len()).unwrap_or(0);
            stats.total_size += size;
            if size > stats.largest_file_size {
                stats.largest_file_size = size;
                stats.largest_file_path = task.relative_path.clone();
            }
        }

        stats.folders = folders.len();
        stats
    }
}

fn calculate_relative_path(file_path: &Path, root_path: &Path) -> Result<PathBuf> {
    let relative = file_path
        .strip_prefix(root_path)
        .map_err(|_| PdfTablesError::InvalidPath {
            path: format!(
                "Cannot calculate relative path for {} from root {}",
                file_path.display(),
                root_path.display()
            ),
        })?;

    if relative.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PdfTablesError::InvalidPath {
            path: format!(
                "Path contains parent directory references: {}",
                relative.display()
            ),
        });
    }

    Ok(relative.to_path_buf())
}

pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|ch| match ch {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' | '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let sanitized = sanitized.trim_matches(&['.', ' ', '_'][..]);

    if sanitized.is_empty() {
        "unnamed".to_string()
    } else {
        sanitized.to_string()
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub folders: usize,
    pub largest_file_size: u64,
    pub largest_file_path: PathBuf,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  PDF files: {}\n  Total size: {}\n  Folders: {}\n",
            self.total_files,
            crate::ui::output::format_bytes(self.total_size),
            self.folders
        );

        if self.largest_file_size > 0 {
            summary.push_str(&format!(
                "  Largest file: {} ({})\n",
                self.largest_file_path.display(),
                crate::ui::output::format_bytes(self.largest_file_size)
            ));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"%PDF-1.4").unwrap();
    }

    #[test]
    fn test_folder_job_mirrors_structure() {
        let temp_dir = TempDir::new().unwrap();
        let a = temp_dir.path().join("A");
        touch(&a.join("x.pdf"));
        touch(&a.join("sub").join("y.pdf"));
        fs::write(a.join("notes.txt"), "not a pdf").unwrap();

        let scanner = PdfScanner::new(&ScanConfig::default());
        let job = ConversionJob::folder(&a, "B");
        let tasks = scanner.enumerate(&job).unwrap();

        let destinations: Vec<_> = tasks.iter().map(|t| t.destination.clone()).collect();
        assert_eq!(
            destinations,
            vec![PathBuf::from("B/sub/y.xlsx"), PathBuf::from("B/x.xlsx")]
        );
        assert_eq!(tasks[0].index, 0);
        assert_eq!(tasks[1].relative_path, PathBuf::from("x.pdf"));
    }

    #[test]
    fn test_enumeration_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["c.pdf", "a.pdf", "b/z.pdf", "b/a.pdf"] {
            touch(&temp_dir.path().join(name));
        }

        let scanner = PdfScanner::new(&ScanConfig::default());
        let tasks = scanner
            .enumerate(&ConversionJob::folder(temp_dir.path(), "out"))
            .unwrap();
        let relative: Vec<_> = tasks.iter().map(|t| t.display_name()).collect();

        assert_eq!(relative, vec!["a.pdf", "b/a.pdf", "b/z.pdf", "c.pdf"]);
    }

    #[test]
    fn test_files_job_keeps_given_order() {
        let scanner = PdfScanner::new(&ScanConfig::default());
        let job = ConversionJob::files(["docs/z.pdf", "other/a.PDF", "missing.txt"], "out");
        let tasks = scanner.enumerate(&job).unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].destination, PathBuf::from("out/z.xlsx"));
        assert_eq!(tasks[1].destination, PathBuf::from("out/a.xlsx"));
        assert_eq!(tasks[2].destination, PathBuf::from("out/missing.xlsx"));
    }

    #[test]
    fn test_default_scan_keeps_every_pdf() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("x.pdf"));
        touch(&temp_dir.path().join("node_modules").join("y.pdf"));
        touch(&temp_dir.path().join(".git").join("z.pdf"));
        let mut deep = temp_dir.path().to_path_buf();
        for _ in 0..40 {
            deep.push("d");
        }
        touch(&deep.join("deep.pdf"));

        let scanner = PdfScanner::new(&ScanConfig::default());
        let files = scanner.scan_directory_skipping(temp_dir.path(), Path::new("")).unwrap();
        let names: Vec<_> = files.iter().map(|f| f.filename.as_str()).collect();

        assert_eq!(files.len(), 4);
        assert!(names.contains(&"y.pdf"));
        assert!(names.contains(&"z.pdf"));
        assert!(names.contains(&"deep.pdf"));
    }

    #[test]
    fn test_configured_exclusions_apply() {
        let temp_dir = TempDir::new().unwrap();
        touch(&temp_dir.path().join("keep.pdf"));
        touch(&temp_dir.path().join("archive").join("old.pdf"));
        touch(&temp_dir.path().join("a").join("b").join("c.pdf"));

        let config = ScanConfig {
            exclude_dirs: vec!["Archive".to_string()],
            max_depth: Some(2),
            ..ScanConfig::default()
        };
        let files = PdfScanner::new(&config)
            .scan_directory_skipping(temp_dir.path(), Path::new(""))
            .unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "keep.pdf");
    }

    #[test]
    fn test_destination_metadata_inside_source_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path();
        touch(&source.join("keep.pdf"));
        touch(&source.join("out").join(METADATA_DIR).join("old.pdf"));
        touch(&source.join("elsewhere").join(METADATA_DIR).join("kept.pdf"));

        let scanner = PdfScanner::new(&ScanConfig::default());
        let tasks = scanner
            .enumerate(&ConversionJob::folder(source, source.join("out")))
            .unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.display_name()).collect();

        assert_eq!(
            names,
            vec![
                format!("elsewhere/{}/kept.pdf", METADATA_DIR),
                "keep.pdf".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_folder_yields_no_tasks() {
        let temp_dir = TempDir::new().unwrap();
        let scanner = PdfScanner::new(&ScanConfig::default());
        let tasks = scanner
            .enumerate(&ConversionJob::folder(temp_dir.path(), "out"))
            .unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_missing_folder_is_an_error() {
        let scanner = PdfScanner::new(&ScanConfig::default());
        let result = scanner.enumerate(&ConversionJob::folder("does/not/exist", "out"));
        assert!(matches!(result, Err(PdfTablesError::InputNotFound { .. })));
    }

    #[test]
    fn test_statistics() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.pdf"), vec![b'x'; 100]).unwrap();
        fs::create_dir(temp_dir.path().join("s")).unwrap();
        fs::write(temp_dir.path().join("s/b.pdf"), vec![b'x'; 300]).unwrap();

        let scanner = PdfScanner::new(&ScanConfig::default());
        let tasks = scanner
            .enumerate(&ConversionJob::folder(temp_dir.path(), "out"))
            .unwrap();
        let stats = scanner.get_statistics(&tasks);

        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_size, 400);
        assert_eq!(stats.folders, 2);
        assert_eq!(stats.largest_file_path, PathBuf::from("s/b.pdf"));
        assert!(stats.display_summary().contains("PDF files: 2"));
    }

    #[test]
    fn test_filename_sanitization() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a<b>c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_filename(".."), "unnamed");
    }
}
