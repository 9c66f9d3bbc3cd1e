//! DuckDB sink
//!
//! The target file is attached to the staging database and each output
//! table is replaced inside its own transaction; a failing table rolls back
//! without touching the others.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use super::error::{LoadError, LoadResult};
use super::{LoadReport, Loader, TableLoadOutcome};
use crate::staging::{StagedTable, StagingDb, quote_ident, quote_literal};
use crate::transform::OutputTables;

const TARGET: &str = "booking_target";

/// Loads tables into a DuckDB database file
#[derive(Debug, Clone)]
pub struct DuckDbLoader {
    path: PathBuf,
}

impl DuckDbLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn replace_table(db: &StagingDb, table: &StagedTable) -> LoadResult<()> {
        let replace = format!(
            "BEGIN TRANSACTION;
             CREATE OR REPLACE TABLE {TARGET}.main.{name} AS SELECT * FROM {name};
             COMMIT;",
            name = quote_ident(&table.name)
        );
        if let Err(e) = db.execute_batch(&replace) {
            let _ = db.execute_batch("ROLLBACK;");
            return Err(e.into());
        }
        Ok(())
    }
}

impl Loader for DuckDbLoader {
    fn name(&self) -> &str {
        "duckdb"
    }

    fn load(&self, db: &StagingDb, tables: &OutputTables) -> LoadResult<LoadReport> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LoadError::io_with_path(parent, e))?;
        }
        db.execute_batch(&format!(
            "DETACH DATABASE IF EXISTS {TARGET}; ATTACH {} AS {TARGET};",
            quote_literal(&self.path.to_string_lossy())
        ))
        .map_err(|e| LoadError::Database(e.to_string()))?;
        info!(database = %self.path.display(), "Loading tables into DuckDB");

        let mut report = LoadReport::new(self.name());
        for table in tables.iter() {
            match Self::replace_table(db, table) {
                Ok(()) => {
                    debug!(table = %table.name, rows = table.rows, "Table loaded");
                    report.push(TableLoadOutcome::loaded(&table.name, table.rows));
                }
                Err(e) => {
                    error!(table = %table.name, error = %e, "Failed to load table");
                    report.push(TableLoadOutcome::failed(&table.name, e.to_string()));
                }
            }
        }

        db.execute_batch(&format!("DETACH DATABASE {TARGET};"))
            .map_err(|e| LoadError::Database(e.to_string()))?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn output_with_hotels(db: &StagingDb) -> OutputTables {
        db.execute_batch(
            "CREATE TABLE dim_hotels (hotel_id BIGINT, hotel VARCHAR);
             INSERT INTO dim_hotels VALUES (1, 'Resort Hotel'), (2, 'City Hotel');",
        )
        .unwrap();
        let mut tables = OutputTables::empty();
        tables.hotels = StagedTable::new("dim_hotels", 2);
        tables
    }

    #[test]
    fn test_load_replaces_tables_and_records_failures() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("warehouse").join("bookings.duckdb");
        let db = StagingDb::memory().unwrap();
        let tables = output_with_hotels(&db);
        let loader = DuckDbLoader::new(&target);

        for _ in 0..2 {
            let report = loader.load(&db, &tables).unwrap();
            assert_eq!(report.rows_written(), 2);
            assert_eq!(report.failed_tables().len(), 5);
            assert!(!report.failed_tables().contains(&"dim_hotels"));
        }

        let check = duckdb::Connection::open(loader.path()).unwrap();
        let rows: i64 = check
            .query_row("SELECT count(*) FROM dim_hotels", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_staging_db_usable_after_load() {
        let temp = TempDir::new().unwrap();
        let db = StagingDb::memory().unwrap();
        let tables = output_with_hotels(&db);

        DuckDbLoader::new(temp.path().join("t.duckdb"))
            .load(&db, &tables)
            .unwrap();
        assert_eq!(db.row_count("dim_hotels").unwrap(), 2);
        db.execute_batch("CREATE TABLE after_load (x BIGINT);").unwrap();
    }
}
