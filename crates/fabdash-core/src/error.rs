use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("missing required column '{column}'")]
    Schema { column: String },

    #[error("data row {row} (line {line}) invalid: {message}")]
    Parse {
        row: usize,
        line: u64,
        message: String,
    },

    #[error("{operation} requires at least one reading")]
    EmptyInput { operation: &'static str },

    #[error("{operation} would need {buckets} buckets, above the limit of {limit}")]
    SpanTooLarge {
        operation: &'static str,
        buckets: i64,
        limit: usize,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Data row position for parse failures, 1-based and excluding the header.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::Parse { row, .. } => Some(*row),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
