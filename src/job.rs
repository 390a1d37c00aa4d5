//! Conversion jobs, the tasks they expand into, and the batch result.

use crate::error::{ConversionError, PdfTablesError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the PDFs of a job come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "paths")]
pub enum JobSource {
    /// Explicit files, converted in the given order straight into the
    /// destination root.
    Files(Vec<PathBuf>),
    /// A folder walked recursively; its hierarchy is mirrored under the
    /// destination root.
    Folder(PathBuf),
}

/// One user request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionJob {
    source: JobSource,
    destination_root: PathBuf,
}

impl ConversionJob {
    pub fn files<I, P>(files: I, destination_root: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            source: JobSource::Files(files.into_iter().map(Into::into).collect()),
            destination_root: destination_root.into(),
        }
    }

    pub fn folder(root: impl Into<PathBuf>, destination_root: impl Into<PathBuf>) -> Self {
        Self {
            source: JobSource::Folder(root.into()),
            destination_root: destination_root.into(),
        }
    }

    /// Build a job from raw command-line inputs: a single directory becomes
    /// a folder job, anything else a files job.
    pub fn from_inputs(inputs: &[PathBuf], destination_root: impl Into<PathBuf>) -> Result<Self> {
        match inputs {
            [] => Err(PdfTablesError::InvalidInput {
                message: "no input paths given".to_string(),
            }),
            [single] if single.is_dir() => Ok(Self::folder(single.clone(), destination_root)),
            many => {
                if let Some(dir) = many.iter().find(|p| p.is_dir()) {
                    return Err(PdfTablesError::InvalidInput {
                        message: format!(
                            "{} is a folder; a folder must be the only input",
                            dir.display()
                        ),
                    });
                }
                Ok(Self::files(many.iter().cloned(), destination_root))
            }
        }
    }

    /// Same job with the destination moved under `<destination>/<folder name>`.
    pub fn nested_under_source_name(self) -> Self {
        match &self.source {
            JobSource::Folder(root) => {
                let name = root
                    .canonicalize()
                    .ok()
                    .and_then(|p| p.file_name().map(|n| n.to_os_string()))
                    .or_else(|| root.file_name().map(|n| n.to_os_string()));
                match name {
                    Some(name) => Self {
                        destination_root: self.destination_root.join(name),
                        source: self.source,
                    },
                    None => self,
                }
            }
            JobSource::Files(_) => self,
        }
    }

    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn is_folder_job(&self) -> bool {
        matches!(self.source, JobSource::Folder(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Skipped
        )
    }

    fn can_become(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Pending, TaskStatus::Skipped)
                | (TaskStatus::Running, TaskStatus::Succeeded)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Running, TaskStatus::Skipped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One source file -> destination file conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionTask {
    pub index: usize,
    pub source: PathBuf,
    pub relative_path: PathBuf,
    pub destination: PathBuf,
    status: TaskStatus,
    error: Option<String>,
    pub tables_written: usize,
    pub rows_written: usize,
    pub duration: Duration,
}

impl ConversionTask {
    pub fn new(index: usize, source: PathBuf, relative_path: PathBuf, destination: PathBuf) -> Self {
        Self {
            index,
            source,
            relative_path,
            destination,
            status: TaskStatus::Pending,
            error: None,
            tables_written: 0,
            rows_written: 0,
            duration: Duration::ZERO,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn display_name(&self) -> String {
        self.relative_path.display().to_string()
    }

    /// Returns false (and leaves the task untouched) when the move would
    /// regress the status.
    fn transition(&mut self, next: TaskStatus) -> bool {
        if self.status.can_become(next) {
            self.status = next;
            true
        } else {
            false
        }
    }

    pub fn start(&mut self) -> bool {
        self.transition(TaskStatus::Running)
    }

    pub fn succeed(&mut self, tables: usize, rows: usize) -> bool {
        if self.transition(TaskStatus::Succeeded) {
            self.tables_written = tables;
            self.rows_written = rows;
            true
        } else {
            false
        }
    }

    pub fn fail(&mut self, error: &ConversionError) -> bool {
        if self.transition(TaskStatus::Failed) {
            self.error = Some(error.to_string());
            true
        } else {
            false
        }
    }

    pub fn skip(&mut self, reason: Option<&str>) -> bool {
        if self.transition(TaskStatus::Skipped) {
            self.error = reason.map(str::to_string);
            true
        } else {
            false
        }
    }
}

/// Outcome of a whole job, in enumeration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub job: ConversionJob,
    pub tasks: Vec<ConversionTask>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl BatchResult {
    pub fn new(
        job: ConversionJob,
        tasks: Vec<ConversionTask>,
        cancelled: bool,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status() == status).count();
        let succeeded = count(TaskStatus::Succeeded);
        let failed = count(TaskStatus::Failed);
        let skipped = count(TaskStatus::Skipped);

        Self {
            job,
            total: tasks.len(),
            tasks,
            succeeded,
            failed,
            skipped,
            cancelled,
            started_at,
            finished_at: Utc::now(),
            elapsed,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionTask> {
        self.tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Failed)
    }

    pub fn is_complete_success(&self) -> bool {
        self.succeeded == self.total && !self.cancelled
    }
}
