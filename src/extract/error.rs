//! Error types for extraction

use std::path::PathBuf;

use thiserror::Error;

use crate::staging::StagingError;

/// Errors that abort extraction. The transform never runs on partial input.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Delimited text could not be read
    #[error("Invalid delimited data in {source_name}: {message}")]
    Csv {
        source_name: String,
        message: String,
    },

    /// HTTP request failed before a response arrived
    #[error("Request to {url} failed: {message}")]
    Http { url: String, message: String },

    /// HTTP response with a non-success status
    #[error("Request to {url} returned status {status}")]
    HttpStatus { url: String, status: u16 },

    /// Response body is not the expected JSON shape
    #[error("Invalid response from {source_name}: {reason}")]
    InvalidResponse { source_name: String, reason: String },

    /// Raw snapshot could not be written
    #[error("Failed to write snapshot {path}: {message}")]
    Snapshot { path: PathBuf, message: String },

    /// Users source requires a disabled feature
    #[error("Users source not supported: {0}")]
    Unsupported(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Staging database error
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;

impl ExtractError {
    pub(crate) fn csv(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Csv {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn invalid_response(
        source_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidResponse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            Self::FileNotFound(path) => format!(
                "Input file not found: {}\n\n\
                Hint: Pass --bookings/--users-file or set the paths in [extract].",
                path.display()
            ),
            Self::Http { url, message } => format!(
                "Could not reach {url}: {message}\n\n\
                Hint: Check your network connection or use --users-file."
            ),
            Self::HttpStatus { url, status } => format!(
                "{url} answered with HTTP {status}.\n\n\
                Hint: Check the users URL in [extract.users]."
            ),
            Self::Unsupported(msg) => format!(
                "{msg}\n\nHint: Rebuild with --features api-backend or read users from a file."
            ),
            Self::Staging(err) => err.user_message(),
            _ => self.to_string(),
        }
    }
}
