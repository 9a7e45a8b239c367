use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Config directory not found at {0}. Run 'crm-report init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Request to '{endpoint}' failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Backend rejected '{endpoint}': {message}")]
    Rejected { endpoint: String, message: String },

    #[error("Malformed response from '{endpoint}': {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    #[error("Invalid {field} '{value}': {reason}")]
    Validation {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("Permission denied: '{action}' on '{module}'")]
    PermissionDenied { module: String, action: String },

    #[error("Failed to write CSV export: {0}")]
    Csv(#[from] csv::Error),

    #[error("Typst not found. Install it from https://typst.app/ or run: cargo install typst-cli")]
    TypstNotFound,

    #[error("Failed to generate PDF: {0}")]
    PdfGeneration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    pub(crate) fn validation(
        field: &'static str,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ReportError::Validation {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
