use crate::config::Config;
use crate::converter::output_manager::ConversionLog;
use crate::error::{ConversionError, PdfTablesError, Result};
use crate::job::{BatchResult, ConversionJob, ConversionTask, TaskStatus};
use crate::scanner::PdfScanner;
use crate::tables::{
    PdfTableExtractor, Table, TableExtractor, TableWriter, WriteSummary, XlsxTableWriter,
};
use crate::ui::signals::CancellationToken;
use chrono::Utc;
use std::any::Any;
use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a waiting task checks for cancellation and its deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Page position inside the file currently being extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    pub page: u32,
    pub pages: u32,
}

/// Snapshot handed to the progress callback on every task transition and
/// after each extracted page.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub task: ConversionTask,
    pub page: Option<PageProgress>,
    pub completed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl ProgressEvent {
    pub fn estimated_remaining(&self) -> Duration {
        if self.completed == 0 {
            return Duration::from_secs(0);
        }

        let rate = self.completed as f64 / self.elapsed.as_secs_f64();
        let remaining = self.total.saturating_sub(self.completed);

        if rate > 0.0 && rate.is_finite() {
            Duration::from_secs_f64(remaining as f64 / rate)
        } else {
            Duration::from_secs(0)
        }
    }
}

/// Running counters for one batch. Shared between workers.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    completed: AtomicUsize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    start_time: Instant,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            start_time: Instant::now(),
        }
    }

    fn record(&self, status: TaskStatus) {
        match status {
            TaskStatus::Succeeded => {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
            }
            TaskStatus::Failed => {
                self.failed.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }
        if status.is_terminal() {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn event(&self, task: &ConversionTask, page: Option<PageProgress>) -> ProgressEvent {
        ProgressEvent {
            task: task.clone(),
            page,
            completed: self.completed(),
            total: self.total,
            succeeded: self.succeeded.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            elapsed: self.elapsed(),
        }
    }
}

/// Serializes writes that target the same destination path.
#[derive(Default)]
struct DestinationLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DestinationLocks {
    fn for_path(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_default())
    }
}

pub type ProgressCallback<'a> = Option<&'a (dyn Fn(&ProgressEvent) + Sync)>;

struct RunContext<'a> {
    progress: BatchProgress,
    locks: DestinationLocks,
    on_progress: ProgressCallback<'a>,
}

impl RunContext<'_> {
    fn emit(&self, task: &ConversionTask) {
        if let Some(callback) = self.on_progress {
            callback(&self.progress.event(task, None));
        }
    }

    fn emit_page(&self, task: &ConversionTask, page: PageProgress) {
        if let Some(callback) = self.on_progress {
            callback(&self.progress.event(task, Some(page)));
        }
    }
}

/// Messages from the extraction thread.
enum ExtractMessage {
    Page(PageProgress),
    Done(std::result::Result<Vec<Table>, ConversionError>),
}

/// Runs every task of a job through the extractor and writer, isolating
/// per-file failures so one bad PDF never stops the batch.
pub struct BatchDriver {
    scanner: PdfScanner,
    extractor: Arc<dyn TableExtractor>,
    writer: Arc<dyn TableWriter>,
    cancel: CancellationToken,
    task_timeout: Option<Duration>,
    workers: usize,
    log: Option<Arc<ConversionLog>>,
}

impl BatchDriver {
    /// Driver with the pdfplumber extractor and xlsx writer configured from `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            scanner: PdfScanner::new(&config.scan)
                .with_output_extension(config.output.output_extension.clone()),
            extractor: Arc::new(PdfTableExtractor::new(&config.extraction)),
            writer: Arc::new(XlsxTableWriter::new(
                config.extraction.layout,
                config.extraction.infer_numeric,
            )),
            cancel: CancellationToken::new(),
            task_timeout: config.task_timeout(),
            workers: config.effective_workers(),
            log: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TableExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_writer(mut self, writer: Arc<dyn TableWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_log(mut self, log: Arc<ConversionLog>) -> Self {
        self.log = Some(log);
        self
    }

    pub fn scanner(&self) -> &PdfScanner {
        &self.scanner
    }

    /// Expand a job into its ordered task list without converting anything.
    pub fn enumerate(&self, job: &ConversionJob) -> Result<Vec<ConversionTask>> {
        self.scanner.enumerate(job)
    }

    /// Enumerate and convert every task of `job`.
    pub fn run(&self, job: &ConversionJob, on_progress: ProgressCallback<'_>) -> Result<BatchResult> {
        let tasks = self.enumerate(job)?;
        self.run_tasks(job, tasks, on_progress)
    }

    /// Convert already enumerated tasks. Only fatal conditions (an unusable
    /// destination root) are returned as errors; task failures end up in
    /// the result.
    pub fn run_tasks(
        &self,
        job: &ConversionJob,
        mut tasks: Vec<ConversionTask>,
        on_progress: ProgressCallback<'_>,
    ) -> Result<BatchResult> {
        let started_at = Utc::now();
        let start = Instant::now();

        let root = job.destination_root();
        fs::create_dir_all(root).map_err(|e| PdfTablesError::Permission {
            path: format!("Cannot create output directory {}: {}", root.display(), e),
        })?;

        info!(
            tasks = tasks.len(),
            destination = %root.display(),
            workers = self.workers,
            "starting batch"
        );

        let ctx = RunContext {
            progress: BatchProgress::new(tasks.len()),
            locks: DestinationLocks::default(),
            on_progress,
        };

        if self.workers > 1 && tasks.len() > 1 {
            self.run_parallel(&mut tasks, &ctx)?;
        } else {
            for task in tasks.iter_mut() {
                self.execute_task(task, &ctx);
            }
        }

        let cancelled = tasks.iter().any(|t| t.status() == TaskStatus::Skipped);
        let result = BatchResult::new(job.clone(), tasks, cancelled, started_at, start.elapsed());

        info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "batch finished"
        );

        Ok(result)
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self, tasks: &mut [ConversionTask], ctx: &RunContext<'_>) -> Result<()> {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| PdfTablesError::Task {
                message: format!("Failed to start worker pool: {}", e),
            })?;

        // par_iter_mut works in place, so result order stays enumeration order.
        pool.install(|| {
            tasks
                .par_iter_mut()
                .for_each(|task| self.execute_task(task, ctx))
        });

        Ok(())
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel(&self, tasks: &mut [ConversionTask], ctx: &RunContext<'_>) -> Result<()> {
        warn!(
            workers = self.workers,
            "built without the `parallel` feature; converting sequentially"
        );
        for task in tasks.iter_mut() {
            self.execute_task(task, ctx);
        }
        Ok(())
    }

    fn execute_task(&self, task: &mut ConversionTask, ctx: &RunContext<'_>) {
        if self.cancel.is_cancelled() {
            task.skip(Some("cancelled"));
            self.finish_task(task, ctx);
            return;
        }

        task.start();
        debug!(file = %task.source.display(), "converting");
        ctx.emit(task);

        let started = Instant::now();
        let outcome = self.convert(task, ctx);
        task.duration = started.elapsed();

        match outcome {
            Ok(summary) => {
                task.succeed(summary.sheets, summary.rows);
            }
            Err(ConversionError::Cancelled) => {
                task.skip(Some("cancelled"));
            }
            Err(e) => {
                task.fail(&e);
            }
        }

        self.finish_task(task, ctx);
    }

    fn finish_task(&self, task: &ConversionTask, ctx: &RunContext<'_>) {
        ctx.progress.record(task.status());

        match task.status() {
            TaskStatus::Succeeded => info!(
                file = %task.source.display(),
                destination = %task.destination.display(),
                sheets = task.tables_written,
                rows = task.rows_written,
                "converted"
            ),
            TaskStatus::Failed => warn!(
                file = %task.source.display(),
                error = task.error().unwrap_or_default(),
                "conversion failed"
            ),
            _ => debug!(file = %task.source.display(), status = %task.status(), "task finished"),
        }

        if let Some(log) = &self.log {
            if let Err(e) = log.record(task) {
                warn!(log = %log.path().display(), "could not append to conversion log: {}", e);
            }
        }

        ctx.emit(task);
    }

    fn convert(
        &self,
        task: &ConversionTask,
        ctx: &RunContext<'_>,
    ) -> std::result::Result<WriteSummary, ConversionError> {
        self.validate_source(&task.source)?;

        let tables = self.extract_watched(task, ctx)?;
        if tables.is_empty() {
            return Err(ConversionError::NoData);
        }

        let lock = ctx.locks.for_path(&task.destination);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.writer.write(&tables, &task.destination)
    }

    fn validate_source(&self, source: &Path) -> std::result::Result<(), ConversionError> {
        let metadata = fs::metadata(source).map_err(|e| {
            ConversionError::Input(format!("cannot access {}: {}", source.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(ConversionError::Input(format!(
                "{} is not a file",
                source.display()
            )));
        }

        if !self.scanner.filter().has_input_extension(source) {
            return Err(ConversionError::Input(format!(
                "unsupported file type: {}",
                source.display()
            )));
        }

        Ok(())
    }

    /// Run the extractor on its own thread so a hung or panicking adapter
    /// turns into a task error instead of stalling or killing the batch.
    /// A timed-out extraction thread is left to finish in the background.
    fn extract_watched(
        &self,
        task: &ConversionTask,
        ctx: &RunContext<'_>,
    ) -> std::result::Result<Vec<Table>, ConversionError> {
        let (tx, rx) = mpsc::channel();
        let extractor = Arc::clone(&self.extractor);
        let path = task.source.clone();

        thread::Builder::new()
            .name("pdf-extract".to_string())
            .spawn(move || {
                let page_tx = tx.clone();
                let mut on_page = move |page: u32, pages: u32| {
                    let _ = page_tx.send(ExtractMessage::Page(PageProgress { page, pages }));
                };
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    extractor.extract(&path, &mut on_page)
                }))
                .unwrap_or_else(|payload| {
                    Err(ConversionError::Extraction(format!(
                        "extractor panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
                let _ = tx.send(ExtractMessage::Done(result));
            })
            .map_err(|e| {
                ConversionError::Extraction(format!("cannot start extraction thread: {}", e))
            })?;

        let deadline = self.task_timeout.map(|limit| (Instant::now() + limit, limit));

        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(ExtractMessage::Done(result)) => return result,
                Ok(ExtractMessage::Page(page)) => {
                    debug!(
                        file = %task.source.display(),
                        "processing page {}/{}",
                        page.page,
                        page.pages
                    );
                    ctx.emit_page(task, page);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ConversionError::Extraction(
                        "extraction stopped unexpectedly".to_string(),
                    ))
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if self.cancel.is_cancelled() {
                return Err(ConversionError::Cancelled);
            }
            if let Some((at, limit)) = deadline {
                if Instant::now() >= at {
                    return Err(ConversionError::Timeout {
                        seconds: limit.as_secs(),
                    });
                }
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
