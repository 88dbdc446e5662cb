//! Errors raised while reading dictionaries and datasets.

use std::path::PathBuf;

use thiserror::Error;

/// Failures to read, parse or persist a source.
///
/// Problems found in the data itself are never errors; they are reported as
/// [`ValidationIssue`](crate::normalize::ValidationIssue) values instead.
#[derive(Debug, Error)]
pub enum CodebookError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tabular dictionary row that cannot be interpreted.
    #[error("dictionary row {row}, column {column}: {message}")]
    Parse {
        row: usize,
        column: usize,
        message: String,
    },

    #[error("malformed delimited data: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("malformed XML: {0}")]
    Xml(String),

    /// Content no parser recognizes as a dictionary.
    #[error("unsupported dictionary layout: {0}")]
    UnsupportedFormat(String),

    #[error("no data: {0}")]
    EmptyData(String),

    /// Saving or loading a dictionary or quality report failed.
    #[error("cannot persist '{path}': {reason}")]
    Persistence { path: PathBuf, reason: String },
}

impl CodebookError {
    pub fn parse_at(row: usize, column: usize, message: impl Into<String>) -> Self {
        CodebookError::Parse {
            row,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CodebookError::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CodebookError>;
