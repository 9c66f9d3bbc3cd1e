//! Error types for transform operations
//!
//! Data-quality anomalies (bad dates, bad coordinates, bad e-mails) never
//! surface here: they are recovered in place and counted in the
//! [`DataQualityReport`](super::DataQualityReport). Only structural failures
//! that would corrupt identity joins abort a stage.

use thiserror::Error;

use crate::staging::StagingError;

/// Classification of transform failures and recovered anomalies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Address/company field is not a valid serialized structure
    MalformedStructuredField,
    /// Date parts or date string do not form a valid date (recovered)
    UnparseableDate,
    /// Numeric coercion failed (recovered)
    InvalidNumericField,
    /// A declared column is absent from a table
    MissingColumn,
    /// A foreign key does not resolve to its dimension
    ReferentialIntegrity,
    /// Any other staging database error
    Staging,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MalformedStructuredField => "MalformedStructuredField",
            Self::UnparseableDate => "UnparseableDate",
            Self::InvalidNumericField => "InvalidNumericField",
            Self::MissingColumn => "MissingColumn",
            Self::ReferentialIntegrity => "ReferentialIntegrity",
            Self::Staging => "Staging",
        };
        write!(f, "{name}")
    }
}

/// Errors that abort a transform stage
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    /// A structured field could not be parsed or lacks a required key
    #[error("Malformed structured field '{field}' in row {row}: {reason}")]
    MalformedStructuredField {
        field: String,
        row: usize,
        reason: String,
    },

    /// A foreign key has no matching dimension row
    #[error(
        "Referential integrity violated: {table}.{column} = {value} not found in {dimension}"
    )]
    ReferentialIntegrity {
        table: String,
        column: String,
        value: String,
        dimension: String,
    },

    /// A key tuple could not be resolved while joining surrogate keys
    #[error("Unresolved key in '{dimension}' for row {row}")]
    UnresolvedKey { dimension: String, row: usize },

    /// Invalid schema configuration
    #[error("Invalid schema configuration: {0}")]
    InvalidSchema(String),

    /// Staging database error, including missing columns
    #[error(transparent)]
    Staging(#[from] StagingError),
}

/// Result type for transform operations
pub type TransformResult<T> = Result<T, TransformError>;

impl From<duckdb::Error> for TransformError {
    fn from(err: duckdb::Error) -> Self {
        TransformError::Staging(StagingError::from(err))
    }
}

impl TransformError {
    /// Create a malformed structured field error
    pub fn malformed(field: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedStructuredField {
            field: field.into(),
            row,
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedStructuredField { .. } => ErrorKind::MalformedStructuredField,
            Self::ReferentialIntegrity { .. } | Self::UnresolvedKey { .. } => {
                ErrorKind::ReferentialIntegrity
            }
            Self::Staging(StagingError::MissingColumn { .. }) => ErrorKind::MissingColumn,
            Self::Staging(_) | Self::InvalidSchema(_) => ErrorKind::Staging,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            Self::MalformedStructuredField { field, row, reason } => {
                format!(
                    "Could not parse '{field}' in users row {row}: {reason}\n\n\
                    Hint: The field must hold a dict literal such as \
                    {{'street': 'Kulas Light', ...}}."
                )
            }
            Self::Staging(err) => err.user_message(),
            _ => self.to_string(),
        }
    }
}
