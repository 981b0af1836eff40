//! Error types for test lifecycle rules.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error carried across the store boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by a test rule.
#[derive(Debug, Error)]
pub enum NoSqlUnitError {
    /// The rule builder was asked to build without a configuration.
    #[error("Configuration object should be provided.")]
    MissingConfiguration,

    /// None of the candidate dataset files exist.
    #[error("Dataset not found, tried: {}", display_paths(.tried))]
    DataSetNotFound {
        /// Every path that was looked up.
        tried: Vec<PathBuf>,
    },

    /// A conventional dataset name was needed but no test class is known.
    #[error("Cannot derive a dataset name for test method {method}: no test class given")]
    UnnamedTestClass {
        /// Test method name.
        method: String,
    },

    /// Reading a dataset file failed.
    #[error("Failed to read dataset {}: {source}", .path.display())]
    Io {
        /// Dataset path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Releasing the store connection failed.
    #[error("{context}")]
    Close {
        /// What was being closed.
        context: String,
        /// The original transport error.
        #[source]
        source: BoxError,
    },

    /// An error from the database operation, passed through unchanged.
    #[error(transparent)]
    Operation(BoxError),
}

impl NoSqlUnitError {
    /// Wrap a store-level error.
    pub fn operation(err: impl Into<BoxError>) -> Self {
        NoSqlUnitError::Operation(err.into())
    }

    /// Wrap a failure raised while releasing a connection.
    pub fn close(context: impl Into<String>, err: impl Into<BoxError>) -> Self {
        NoSqlUnitError::Close {
            context: context.into(),
            source: err.into(),
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for rule operations.
pub type Result<T> = std::result::Result<T, NoSqlUnitError>;
