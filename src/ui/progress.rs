use crate::converter::ProgressEvent;
use crate::job::TaskStatus;
use crate::ui::output::format_duration;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    pub fn create_file_progress(&self, total_files: u64) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(ProgressBar::new(total_files));
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} files {msg}"
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
        );
        pb.set_message("Converting...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new(true)
    }
}

pub fn update_file_progress(pb: &ProgressBar, event: &ProgressEvent) {
    pb.set_position(event.completed as u64);

    let eta = if event.completed > 0 {
        let remaining = event.estimated_remaining();
        if remaining.as_secs() > 0 {
            format!(" (ETA: {})", format_duration(remaining))
        } else {
            String::new()
        }
    } else {
        String::new()
    };

    let message = match event.task.status() {
        TaskStatus::Running => match event.page {
            Some(page) => format!(
                "Converting {} (page {}/{}){}",
                event.task.display_name(),
                page.page,
                page.pages,
                eta
            ),
            None => format!("Converting {}{}", event.task.display_name(), eta),
        },
        TaskStatus::Failed => format!(
            "Failed {} ({} failed so far){}",
            event.task.display_name(),
            event.failed,
            eta
        ),
        status => format!("{} {}{}", status, event.task.display_name(), eta),
    };
    pb.set_message(message);
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    let final_message = format!("{} (completed in {})", message, format_duration(duration));
    pb.finish_with_message(final_message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::PageProgress;
    use crate::job::ConversionTask;
    use std::path::PathBuf;

    fn event(status_running: bool, completed: usize) -> ProgressEvent {
        let mut task = ConversionTask::new(
            0,
            PathBuf::from("in/a.pdf"),
            PathBuf::from("a.pdf"),
            PathBuf::from("out/a.xlsx"),
        );
        task.start();
        if !status_running {
            task.succeed(1, 1);
        }
        ProgressEvent {
            task,
            completed,
            total: 4,
            succeeded: completed,
            failed: 0,
            elapsed: Duration::from_secs(10),
            page: None,
        }
    }

    #[test]
    fn test_disabled_progress_bar_is_hidden() {
        let manager = ProgressManager::new(false);
        assert!(manager.create_file_progress(100).is_hidden());
    }

    #[test]
    fn test_update_file_progress() {
        let pb = ProgressBar::hidden();
        pb.set_length(4);

        update_file_progress(&pb, &event(true, 0));
        assert_eq!(pb.position(), 0);
        assert_eq!(pb.message(), "Converting a.pdf");

        update_file_progress(&pb, &event(false, 2));
        assert_eq!(pb.position(), 2);
        assert_eq!(pb.message(), "succeeded a.pdf (ETA: 10s)");
    }

    #[test]
    fn test_page_progress_message() {
        let pb = ProgressBar::hidden();
        let mut running = event(true, 0);
        running.page = Some(PageProgress { page: 3, pages: 12 });

        update_file_progress(&pb, &running);
        assert_eq!(pb.message(), "Converting a.pdf (page 3/12)");
    }
}
