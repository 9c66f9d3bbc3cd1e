//! Error types for staging operations

use thiserror::Error;

/// Errors raised by the staging database
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StagingError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// A column named by the caller is absent from a staged table
    #[error("Table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// A staged table does not exist
    #[error("Table '{0}' is not staged")]
    MissingTable(String),
}

/// Result type for staging operations
pub type StagingResult<T> = Result<T, StagingError>;

impl StagingError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StagingError::MissingColumn { table, column } => format!(
                "Input table '{table}' has no column '{column}'.\n\n\
                Hint: Check the input header or the [transform.schema] column lists."
            ),
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for StagingError {
    fn from(err: duckdb::Error) -> Self {
        StagingError::Database(err.to_string())
    }
}
