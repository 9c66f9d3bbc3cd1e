//! Load stage: persist the output tables
//!
//! A [`Loader`] writes every output table and reports the outcome per table.
//! One table failing is logged and recorded; the remaining tables are still
//! written.
//!
//! - [`CsvLoader`] writes `<output_dir>/<table>.csv`
//! - [`DuckDbLoader`] replaces tables in a DuckDB file

mod config;
pub mod csv;
mod db;
mod error;

pub use config::{DatabaseConfig, LoadConfig};
pub use db::DuckDbLoader;
pub use error::{LoadError, LoadResult};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::extract::delimiter_byte;
use crate::staging::StagingDb;
use crate::transform::OutputTables;

/// Persists output tables
pub trait Loader {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Write every table. Errors are returned only when nothing could be
    /// attempted; per-table failures go into the report.
    fn load(&self, db: &StagingDb, tables: &OutputTables) -> LoadResult<LoadReport>;
}

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLoadOutcome {
    pub table: String,
    pub rows: usize,
    /// Written file, for file sinks
    pub artifact: Option<PathBuf>,
    /// SHA-256 of the written file
    pub sha256: Option<String>,
    /// Failure message; `None` when the table loaded
    pub error: Option<String>,
}

impl TableLoadOutcome {
    pub fn loaded(table: impl Into<String>, rows: usize) -> Self {
        Self {
            table: table.into(),
            rows,
            artifact: None,
            sha256: None,
            error: None,
        }
    }

    pub fn failed(table: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            rows: 0,
            artifact: None,
            sha256: None,
            error: Some(error.into()),
        }
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>, sha256: impl Into<String>) -> Self {
        self.artifact = Some(path.into());
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-table results of one loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub loader: String,
    pub tables: Vec<TableLoadOutcome>,
}

impl LoadReport {
    pub fn new(loader: impl Into<String>) -> Self {
        Self {
            loader: loader.into(),
            tables: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: TableLoadOutcome) {
        self.tables.push(outcome);
    }

    /// True when every table loaded
    pub fn is_success(&self) -> bool {
        self.tables.iter().all(TableLoadOutcome::is_success)
    }

    /// Names of the tables that failed
    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.is_success())
            .map(|t| t.table.as_str())
            .collect()
    }

    /// Rows written across successful tables
    pub fn rows_written(&self) -> usize {
        self.tables
            .iter()
            .filter(|t| t.is_success())
            .map(|t| t.rows)
            .sum()
    }

    /// Files written
    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.tables
            .iter()
            .filter_map(|t| t.artifact.clone())
            .collect()
    }
}

/// Writes each table as a delimited file
#[derive(Debug, Clone)]
pub struct CsvLoader {
    output_dir: PathBuf,
    delimiter: char,
}

impl CsvLoader {
    pub fn new(output_dir: impl Into<PathBuf>, delimiter: char) -> Self {
        Self {
            output_dir: output_dir.into(),
            delimiter,
        }
    }

    pub fn from_config(config: &LoadConfig) -> Self {
        Self::new(config.output_dir.clone(), config.delimiter)
    }

    /// Path a table is written to
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.csv"))
    }
}

impl Loader for CsvLoader {
    fn name(&self) -> &str {
        "csv"
    }

    fn load(&self, db: &StagingDb, tables: &OutputTables) -> LoadResult<LoadReport> {
        let delimiter = delimiter_byte(self.delimiter).map_err(LoadError::InvalidConfig)?;
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| LoadError::io_with_path(&self.output_dir, e))?;
        info!(output_dir = %self.output_dir.display(), "Writing tables");

        let mut report = LoadReport::new(self.name());
        for table in tables.iter() {
            let path = self.table_path(&table.name);
            match csv::write_table(db, &table.name, &path, delimiter) {
                Ok(sha256) => report.push(
                    TableLoadOutcome::loaded(&table.name, table.rows).with_artifact(path, sha256),
                ),
                Err(e) => {
                    error!(table = %table.name, error = %e, "Failed to write table");
                    report.push(TableLoadOutcome::failed(&table.name, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
