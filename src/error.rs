//! Error types for density-bench
//!
//! Toyota Way: Clear error messages with actionable guidance (Respect for People)

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// density-bench error types
///
/// Configuration errors (`DataLoad`, `SchemaMismatch`, `InvalidConfig`) mean the
/// experiment setup is broken. They are never retried.
#[derive(Error, Debug)]
pub enum Error {
    /// A fold file is missing or cannot be parsed
    #[error("Failed to load fold data from {path}: {reason}\nCheck the dataset root and fold layout")]
    DataLoad {
        /// File that failed to load
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// A matrix does not conform to the declared schema
    #[error("Schema mismatch for {context}: schema declares {expected} columns, data has {actual}")]
    SchemaMismatch {
        /// Which matrix was checked (e.g. "fold 3 train")
        context: String,
        /// Column count declared by the schema
        expected: usize,
        /// Column count found in the data
        actual: usize,
    },

    /// Invalid benchmark configuration (fold count, bandwidth policy, type string, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fatal numerical failure inside an estimator
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    /// Shorthand for a [`Error::DataLoad`] error.
    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by a broken experiment setup rather than by an estimator.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DataLoad { .. } | Self::SchemaMismatch { .. } | Self::InvalidConfig(_)
        )
    }
}
