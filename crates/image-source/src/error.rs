use std::path::PathBuf;

use cardiomotion_common::error::CardioError;

/// Errors raised while locating or reading imager output.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Source directory does not exist: {path}")]
    MissingDirectory { path: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Metadata error in {path}: {message}")]
    Metadata { path: PathBuf, message: String },

    #[error("No frames successfully loaded for {well} ({attempted} attempted)")]
    NoFrames { well: String, attempted: usize },

    #[error("Loading cancelled")]
    Cancelled,
}

impl From<SourceError> for CardioError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => CardioError::Cancelled,
            SourceError::MissingDirectory { path } => CardioError::FileNotFound { path },
            other => CardioError::source(other.to_string()),
        }
    }
}
