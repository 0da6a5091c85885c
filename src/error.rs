// src/error.rs
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The input file could not be read (missing, unreadable, not UTF-8).
    #[error("cannot read input file '{}': {source}", path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Ambiguous or malformed classification rules. Never defaulted silently.
    #[error("classification configuration error: {0}")]
    ClassificationConfig(String),

    /// Anything raised by the underlying tokenizer library, passed through as-is.
    #[error("{context}: {source}")]
    ExternalTooling {
        context: String,
        #[source]
        source: BoxError,
    },
}

impl ReportError {
    pub fn external(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ReportError::ExternalTooling {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

/// Reads a whole UTF-8 file, attaching the path to any failure.
pub fn read_input(path: impl Into<PathBuf>) -> Result<String> {
    let path = path.into();
    std::fs::read_to_string(&path).map_err(|source| ReportError::Input { path, source })
}
