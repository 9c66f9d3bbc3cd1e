//! Error types for pipeline operations
//!
//! Stage errors keep their source so the CLI can show the stage's own
//! hint through [`PipelineError::user_message`].

use std::path::PathBuf;

use thiserror::Error;

use crate::extract::ExtractError;
use crate::load::LoadError;
use crate::staging::StagingError;
use crate::transform::TransformError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Staging database failure outside a stage
    #[error("Staging failed: {0}")]
    Staging(#[from] StagingError),

    /// Extract stage failure
    #[error("Extract failed: {0}")]
    Extract(#[from] ExtractError),

    /// Transform stage failure
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    /// Load stage failure
    #[error("Load failed: {0}")]
    Load(#[from] LoadError),

    /// IO error with path context
    #[error("IO error with {path}: {message}")]
    IoErrorWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoErrorWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!(
                    "Configuration error: {msg}\n\n\
                     Hint: Check your pipeline configuration file."
                )
            }
            PipelineError::MissingInput(input) => {
                format!(
                    "Missing required input: {input}\n\n\
                     Hint: Ensure all required files exist and paths are correct."
                )
            }
            PipelineError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\n\
                     Hint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            PipelineError::Staging(e) => e.user_message(),
            PipelineError::Extract(e) => e.user_message(),
            PipelineError::Transform(e) => e.user_message(),
            PipelineError::Load(e) => e.user_message(),
            _ => self.to_string(),
        }
    }
}
