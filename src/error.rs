use thiserror::Error;

/// Errors that abort a whole job (or the program) before or instead of
/// producing a batch result.
#[derive(Error, Debug)]
pub enum PdfTablesError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Input path not found: {path}")]
    InputNotFound { path: String },

    #[error("No PDF files found")]
    NoPdfFound { searched_extensions: Vec<String> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("Operation was cancelled by user")]
    Cancelled,

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("Background task failed: {message}")]
    Task { message: String },
}

/// Failure of a single conversion task. These never escape the batch driver;
/// they are recorded on the task and the batch moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("input error: {0}")]
    Input(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("no tabular data found")]
    NoData,

    #[error("timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("cancelled")]
    Cancelled,
}

impl From<rust_xlsxwriter::XlsxError> for ConversionError {
    fn from(error: rust_xlsxwriter::XlsxError) -> Self {
        ConversionError::Write(error.to_string())
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for PdfTablesError {
    fn user_message(&self) -> String {
        match self {
            PdfTablesError::InvalidInput { message } => {
                format!("Invalid input: {}", message)
            }
            PdfTablesError::InputNotFound { path } => {
                format!("Input path does not exist: {}", path)
            }
            PdfTablesError::NoPdfFound { searched_extensions } => {
                format!(
                    "No input files found with extensions: {}",
                    searched_extensions.join(", ")
                )
            }
            PdfTablesError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            PdfTablesError::Permission { path } => {
                format!("Permission denied accessing: {}", path)
            }
            PdfTablesError::Cancelled => "Operation was cancelled by user".to_string(),
            PdfTablesError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            PdfTablesError::InvalidInput { .. } => Some(
                "Pass either a single folder or one or more PDF files (e.g., pdf-tables reports/ -o out/)".to_string()
            ),
            PdfTablesError::InputNotFound { .. } => Some(
                "Check the spelling of the path and that it is reachable from the current directory.".to_string()
            ),
            PdfTablesError::NoPdfFound { .. } => Some(
                "Make sure the folder contains .pdf files, or adjust [scan] extensions and exclude_dirs in the configuration.".to_string()
            ),
            PdfTablesError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            PdfTablesError::Permission { .. } => Some(
                "Ensure you have write permission for the destination directory, or choose another one with --output.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for PdfTablesError {
    fn from(error: toml::de::Error) -> Self {
        PdfTablesError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for PdfTablesError {
    fn from(error: serde_json::Error) -> Self {
        PdfTablesError::Config {
            message: format!("Failed to serialize report: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, PdfTablesError>;
