//! Error types shared across CardioMotion crates.

use std::path::PathBuf;

/// Top-level error type for CardioMotion operations.
#[derive(Debug, thiserror::Error)]
pub enum CardioError {
    /// A parameter is outside its valid domain (e.g. cutoff not in `[0, 1]`).
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Input data violates a contract (empty series, mismatched frame shapes).
    #[error("Invalid input: {message}")]
    Input { message: String },

    #[error("Analysis error: {message}")]
    Analysis { message: String },

    #[error("Image source error: {message}")]
    Source { message: String },

    #[error("Table error: {message}")]
    Table { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CardioError.
pub type CardioResult<T> = Result<T, CardioError>;

impl CardioError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: msg.into(),
        }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input {
            message: msg.into(),
        }
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis {
            message: msg.into(),
        }
    }

    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source {
            message: msg.into(),
        }
    }

    pub fn table(msg: impl Into<String>) -> Self {
        Self::Table {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error came from a user interrupt rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
