//! Error types for loading

use std::path::PathBuf;

use thiserror::Error;

use crate::staging::StagingError;

/// Errors raised while persisting tables.
///
/// A loader returns these for failures that stop it from starting at all.
/// Failures of a single table are recorded in the load report instead.
#[derive(Error, Debug)]
pub enum LoadError {
    /// IO error with path context
    #[error("IO error with {path}: {source}")]
    IoWithPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Staging database error
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;

impl LoadError {
    pub fn io_with_path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoWithPath {
            path: path.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            Self::IoWithPath { path, source } => format!(
                "Could not write {}: {source}\n\n\
                Hint: Check that the output directory is writable.",
                path.display()
            ),
            Self::Database(msg) => format!(
                "Database error: {msg}\n\n\
                Hint: Check the [load.database] path and that no other process holds the file."
            ),
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for LoadError {
    fn from(err: duckdb::Error) -> Self {
        LoadError::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_with_path_message() {
        let err = LoadError::io_with_path(
            "/out/dim_hotels.csv",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/out/dim_hotels.csv"));
        assert!(err.user_message().contains("Hint:"));
    }
}
