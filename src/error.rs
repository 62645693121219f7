//! Error types for data-logger decoding.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataloggerError {
    /// No registered format recognized the input.
    #[error("unrecognized data-logger format")]
    UnrecognizedFormat,

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("{format} header version {version} is recognized but cannot be decoded")]
    UnsupportedVersion { format: &'static str, version: u16 },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("truncated data: expected at least {expected} bytes, got {actual}")]
    TruncatedData { expected: usize, actual: usize },

    #[error("companion metadata file not found: {}", .0.display())]
    MissingCompanionFile(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DataloggerError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedHeader(msg.into())
    }

    pub(crate) fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedFeature(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, DataloggerError>;
