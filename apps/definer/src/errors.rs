use std::path::PathBuf;

use thiserror::Error;

use crate::definitions::template::TemplateError;

/// Fatal, run-aborting errors.
///
/// Anything that surfaces as an `AppError` stops the batch before (or instead
/// of) writing the final output. Per-group API failures are NOT represented
/// here; they are `LlmError`s that the runner converts into placeholder records.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt template {path:?} is invalid: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input file {path:?} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Read {
            path: path.into(),
            source,
        }
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::Write {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        AppError::Csv {
            path: path.into(),
            source,
        }
    }
}
