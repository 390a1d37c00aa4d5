use clap::Parser;
use pdf_tables::{
    logging, output_mode_for, BatchResult, Cli, OutputFormatter, OutputMode, PdfTables,
    PdfTablesError, UserFriendlyError,
};
use std::process;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    process::exit(exit_code);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for_error(&e);
        }
    };

    let _log_guard = match logging::init_logging(&config.logging, cli.verbose, cli.quiet) {
        Ok(guard) => guard,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    tracing::debug!("{}", pdf_tables::build_info());

    let job = match cli.conversion_job(&config) {
        Ok(job) => job,
        Err(e) => {
            print_startup_error(&e);
            return exit_code_for_error(&e);
        }
    };

    let app = match PdfTables::new(
        config,
        output_mode_for(&cli.output_format),
        cli.verbose,
        cli.quiet,
    ) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&e);
            return 1;
        }
    };

    if cli.dry_run {
        return handle_dry_run(&app, &job);
    }

    match app.convert(job).await {
        Ok(result) => exit_code_for_result(&result),
        Err(e) => {
            app.handle_error(&e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_result(result: &BatchResult) -> i32 {
    if result.cancelled {
        130
    } else if result.failed > 0 {
        2 // Some files failed
    } else {
        0
    }
}

fn exit_code_for_error(error: &PdfTablesError) -> i32 {
    match error {
        PdfTablesError::Cancelled => 130, // Interrupted (SIGINT)
        PdfTablesError::InvalidInput { .. }
        | PdfTablesError::InputNotFound { .. }
        | PdfTablesError::InvalidPath { .. } => 3,
        PdfTablesError::NoPdfFound { .. } => 6,
        PdfTablesError::Permission { .. } => 7,
        _ => 1,
    }
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| "pdf-tables.toml".to_string());

    match PdfTables::generate_sample_config(&config_path) {
        Ok(()) => {
            OutputFormatter::new(OutputMode::Human, 0, false)
                .success(&format!("Generated sample configuration file: {}", config_path));
            println!("\nTo use this configuration:");
            println!("  pdf-tables <folder> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(app: &PdfTables, job: &pdf_tables::ConversionJob) -> i32 {
    let formatter = app.output_formatter();
    formatter.info("DRY RUN MODE - No files will be converted");

    let tasks = match app.plan(job) {
        Ok(tasks) => tasks,
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for_error(&e);
        }
    };

    if tasks.is_empty() {
        let e = PdfTablesError::NoPdfFound {
            searched_extensions: app.config().scan.extensions.clone(),
        };
        app.handle_error(&e);
        return exit_code_for_error(&e);
    }

    let config = app.config();
    formatter.info(&format!(
        "Layout: {}, numeric columns: {}, workers: {}",
        config.extraction.layout,
        config.extraction.infer_numeric,
        config.effective_workers()
    ));
    formatter.print_task_plan(&tasks);
    0
}

fn print_startup_error(error: &PdfTablesError) {
    let formatter = OutputFormatter::new(OutputMode::Human, 0, false);
    formatter.print_user_friendly_error(error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdf_tables::{Config, ConversionError, ConversionJob, ConversionTask};
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_command() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let cli = Cli::try_parse_from([
            "pdf-tables",
            "--generate-config",
            "--config",
            config_path.to_str().unwrap(),
        ])
        .unwrap();

        assert_eq!(handle_generate_config(&cli), 0);
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[extraction]"));
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(exit_code_for_error(&PdfTablesError::Cancelled), 130);
        assert_eq!(
            exit_code_for_error(&PdfTablesError::NoPdfFound {
                searched_extensions: vec!["pdf".into()]
            }),
            6
        );
        assert_eq!(
            exit_code_for_error(&PdfTablesError::InputNotFound { path: "x".into() }),
            3
        );
        assert_eq!(
            exit_code_for_error(&PdfTablesError::Permission { path: "x".into() }),
            7
        );
        assert_eq!(
            exit_code_for_error(&PdfTablesError::Config { message: "x".into() }),
            1
        );
    }

    #[test]
    fn test_result_exit_codes() {
        let mut ok = ConversionTask::new(0, "a.pdf".into(), "a.pdf".into(), "a.xlsx".into());
        ok.start();
        ok.succeed(1, 1);
        let mut bad = ConversionTask::new(1, "b.pdf".into(), "b.pdf".into(), "b.xlsx".into());
        bad.start();
        bad.fail(&ConversionError::NoData);

        let job = ConversionJob::files(["a.pdf", "b.pdf"], "out");
        let clean = BatchResult::new(
            job.clone(),
            vec![ok.clone()],
            false,
            chrono::Utc::now(),
            Duration::ZERO,
        );
        assert_eq!(exit_code_for_result(&clean), 0);

        let partial = BatchResult::new(job, vec![ok, bad], false, chrono::Utc::now(), Duration::ZERO);
        assert_eq!(exit_code_for_result(&partial), 2);
    }

    #[test]
    fn test_dry_run_mode() {
        let source = TempDir::new().unwrap();
        fs::write(source.path().join("a.pdf"), b"%PDF").unwrap();

        let app = PdfTables::new_for_test(Config::default(), OutputMode::Plain, 0, true);
        let job = ConversionJob::folder(source.path(), PathBuf::from("out"));
        assert_eq!(handle_dry_run(&app, &job), 0);
        assert!(!PathBuf::from("out/a.xlsx").exists());

        let empty = TempDir::new().unwrap();
        let job = ConversionJob::folder(empty.path(), PathBuf::from("out"));
        assert_eq!(handle_dry_run(&app, &job), 6);
    }
}
