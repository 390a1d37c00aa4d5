use crate::error::{PdfTablesError, UserFriendlyError};
use crate::job::{BatchResult, ConversionTask};
use console::{style, Emoji, Term};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");
static SPARKLES: Emoji = Emoji("✨ ", "* ");

pub struct OutputFormatter {
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let use_colors = match mode {
            OutputMode::Human => Term::stdout().features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &PdfTablesError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Final per-batch summary. Failures are always listed, even in quiet
    /// mode.
    pub fn print_batch_summary(&self, result: &BatchResult) {
        match self.mode {
            OutputMode::Human => self.print_human_summary(result),
            OutputMode::Json => self.print_json_summary(result),
            OutputMode::Plain => self.print_plain_summary(result),
        }
    }

    /// What a dry run would convert.
    pub fn print_task_plan(&self, tasks: &[ConversionTask]) {
        match self.mode {
            OutputMode::Json => {
                let plan: Vec<_> = tasks
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "source": t.source,
                            "destination": t.destination,
                        })
                    })
                    .collect();
                self.print_json_object(&serde_json::json!({
                    "type": "plan",
                    "tasks": plan
                }));
            }
            _ => {
                self.print_header("Dry Run");
                for task in tasks {
                    println!(
                        "  {} -> {}",
                        task.source.display(),
                        task.destination.display()
                    );
                }
                println!();
                println!("{} file(s) would be converted", tasks.len());
            }
        }
    }

    pub fn print_header(&self, title: &str) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                println!();
                if self.use_colors {
                    println!("{} {}", SPARKLES, style(title).bold().cyan());
                } else {
                    println!("=== {} ===", title);
                }
                println!();
            }
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "header",
                    "title": title
                }));
            }
            OutputMode::Plain => {
                println!("=== {} ===", title);
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: impl ToString) -> String {
        if self.use_colors {
            style(value.to_string()).cyan().bold().to_string()
        } else {
            value.to_string()
        }
    }

    fn print_human_summary(&self, result: &BatchResult) {
        if !self.quiet {
            println!();
            self.print_separator();

            let headline = if result.cancelled {
                "Conversion cancelled"
            } else if result.is_complete_success() {
                "Conversion completed!"
            } else {
                "Conversion finished with failures"
            };
            if self.use_colors {
                let styled = if result.is_complete_success() {
                    style(headline).green().bold()
                } else {
                    style(headline).yellow().bold()
                };
                println!("{} {}", styled, CHECKMARK);
            } else {
                println!("✓ {}", headline);
            }

            println!();
            println!("  Files:       {}", self.highlight(result.total));
            println!("  Converted:   {}", self.highlight(result.succeeded));
            println!("  Failed:      {}", self.highlight(result.failed));
            if result.skipped > 0 {
                println!("  Skipped:     {}", self.highlight(result.skipped));
            }
            println!(
                "  Time taken:  {}",
                self.highlight(format_duration(result.elapsed))
            );
            println!(
                "  Output:      {}",
                result.job.destination_root().display()
            );
        }

        if result.failed > 0 {
            eprintln!();
            eprintln!("Failed files:");
            for task in result.failures() {
                eprintln!(
                    "  {} {}: {}",
                    CROSS,
                    task.source.display(),
                    task.error().unwrap_or("unknown error")
                );
            }
        }

        self.print_separator();
    }

    fn print_json_summary(&self, result: &BatchResult) {
        let failures: Vec<_> = result
            .failures()
            .map(|t| {
                serde_json::json!({
                    "source": t.source,
                    "error": t.error(),
                })
            })
            .collect();

        let summary = serde_json::json!({
            "type": "summary",
            "total": result.total,
            "succeeded": result.succeeded,
            "failed": result.failed,
            "skipped": result.skipped,
            "cancelled": result.cancelled,
            "duration_ms": result.elapsed.as_millis() as u64,
            "destination": result.job.destination_root(),
            "failures": failures,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });

        println!(
            "{}",
            serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn print_plain_summary(&self, result: &BatchResult) {
        if !self.quiet {
            println!("COMPLETED: PDF table conversion");
            println!("Files: {}", result.total);
            println!("Succeeded: {}", result.succeeded);
            println!("Failed: {}", result.failed);
            println!("Skipped: {}", result.skipped);
            println!("Duration: {:?}", result.elapsed);
        }
        for task in result.failures() {
            eprintln!(
                "FAILED: {}: {}",
                task.source.display(),
                task.error().unwrap_or("unknown error")
            );
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
