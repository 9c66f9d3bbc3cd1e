//! Staging: the embedded database a run works in
//!
//! Extract lands raw inputs here as text tables, the transform types,
//! cleans and reshapes them with SQL, and loaders read the output tables
//! back out. One in-memory database lives for one pipeline run.

mod db;
mod error;

pub use db::{ColumnType, ROW_ID, StagingDb, TextAppender, quote_ident, quote_literal};
pub use error::{StagingError, StagingResult};

use serde::{Deserialize, Serialize};

/// Name and row count of a staged table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedTable {
    pub name: String,
    pub rows: usize,
}

impl StagedTable {
    pub fn new(name: impl Into<String>, rows: usize) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// Re-read the row count from the database
    pub fn refresh(db: &StagingDb, name: &str) -> StagingResult<Self> {
        Ok(Self::new(name, db.row_count(name)?))
    }
}
