use crate::config::LoggingConfig;
use crate::error::{PdfTablesError, Result};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Level used for the filter: `-v` flags raise the configured level, `-q`
/// lowers it to errors only.
pub fn effective_level(config: &LoggingConfig, verbose: u8, quiet: bool) -> String {
    if quiet {
        return "error".to_string();
    }

    match verbose {
        0 => config.level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global subscriber. Diagnostics go to stderr so stdout stays
/// clean for `--output-format json`. `RUST_LOG` wins over the config.
///
/// Keep the returned guard alive until exit or buffered file output is lost.
pub fn init_logging(config: &LoggingConfig, verbose: u8, quiet: bool) -> Result<Option<WorkerGuard>> {
    let level = effective_level(config, verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .map_err(|e| PdfTablesError::Config {
            message: format!("Invalid log level {:?}: {}", level, e),
        })?;

    let stderr_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let (file_layer, guard) = match &config.file {
        Some(path) => {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            fs::create_dir_all(parent)?;
            let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PdfTablesError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        let config = LoggingConfig::default();

        assert_eq!(effective_level(&config, 0, false), "warn");
        assert_eq!(effective_level(&config, 1, false), "info");
        assert_eq!(effective_level(&config, 2, false), "debug");
        assert_eq!(effective_level(&config, 5, false), "trace");
        assert_eq!(effective_level(&config, 0, true), "error");
    }
}
