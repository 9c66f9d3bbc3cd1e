//! Extract stage: land the raw bookings and users tables
//!
//! Bookings come from a delimited file. Users come from either an HTTP
//! JSON endpoint (feature `api-backend`) or a delimited file. Any failure
//! aborts the stage; the transform never runs on partial input.
//!
//! Every cell is landed as text. Typing happens in the transform, per
//! column, so identifiers keep their leading zeros.

mod api;
mod config;
pub mod csv;
mod error;

#[cfg(feature = "api-backend")]
pub use api::fetch_users;
pub use api::users_from_json;
pub use config::{
    DEFAULT_NULL_VALUES, DEFAULT_USERS_URL, ExtractConfig, UsersSource, delimiter_byte,
};
pub use error::{ExtractError, ExtractResult};

use std::path::PathBuf;

use tracing::{debug, info};

use crate::load::csv::write_query;
use crate::staging::{ROW_ID, StagedTable, StagingDb, quote_ident};
use crate::transform::RawTables;

/// Raw bookings table in the staging database
pub const BOOKINGS_TABLE: &str = "raw_bookings";
/// Raw users table in the staging database
pub const USERS_TABLE: &str = "raw_users";
/// Snapshot file stem of the raw bookings
pub const BOOKINGS_SNAPSHOT: &str = "hotel_bookings";
/// Snapshot file stem of the raw users
pub const USERS_SNAPSHOT: &str = "users";

/// Lands the raw input tables in the staging database
pub trait Extractor {
    fn extract(&self, db: &StagingDb) -> ExtractResult<RawTables>;
}

/// Reads bookings from a file and users from the configured source
#[derive(Debug, Clone, Default)]
pub struct SourceExtractor {
    config: ExtractConfig,
}

impl SourceExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Land the bookings table
    pub fn read_bookings(&self, db: &StagingDb) -> ExtractResult<StagedTable> {
        let delimiter =
            delimiter_byte(self.config.bookings_delimiter).map_err(ExtractError::InvalidConfig)?;
        csv::land_delimited_path(
            db,
            &self.config.bookings_path,
            BOOKINGS_TABLE,
            delimiter,
            &self.config.null_values,
        )
    }

    /// Land the users table from the configured source
    pub fn read_users(&self, db: &StagingDb) -> ExtractResult<StagedTable> {
        match &self.config.users {
            UsersSource::Path(path) => {
                let delimiter = delimiter_byte(self.config.users_delimiter)
                    .map_err(ExtractError::InvalidConfig)?;
                csv::land_delimited_path(
                    db,
                    path,
                    USERS_TABLE,
                    delimiter,
                    &self.config.null_values,
                )
            }
            UsersSource::Url(url) => {
                let body = self.fetch(url)?;
                users_from_json(db, &body, url, USERS_TABLE)
            }
        }
    }

    #[cfg(feature = "api-backend")]
    fn fetch(&self, url: &str) -> ExtractResult<String> {
        fetch_users(url, self.config.http_timeout_secs)
    }

    #[cfg(not(feature = "api-backend"))]
    fn fetch(&self, url: &str) -> ExtractResult<String> {
        Err(ExtractError::Unsupported(format!(
            "fetching users from {url} requires the api-backend feature"
        )))
    }

    /// Write the raw tables to the snapshot directory, if configured
    pub fn write_snapshot(&self, db: &StagingDb, raw: &RawTables) -> ExtractResult<Vec<PathBuf>> {
        let Some(dir) = &self.config.snapshot_dir else {
            return Ok(Vec::new());
        };
        std::fs::create_dir_all(dir).map_err(|e| ExtractError::Snapshot {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        let mut written = Vec::new();
        for (table, stem, delimiter) in [
            (&raw.bookings, BOOKINGS_SNAPSHOT, self.config.bookings_delimiter),
            (&raw.users, USERS_SNAPSHOT, self.config.users_delimiter),
        ] {
            let path = dir.join(format!("{stem}.csv"));
            let delimiter = delimiter_byte(delimiter).map_err(ExtractError::InvalidConfig)?;
            let select = format!(
                "SELECT * EXCLUDE ({row_id}) FROM {} ORDER BY {row_id}",
                quote_ident(&table.name),
                row_id = quote_ident(ROW_ID),
            );
            write_query(db, &select, &path, delimiter).map_err(|e| ExtractError::Snapshot {
                path: path.clone(),
                message: e.to_string(),
            })?;
            debug!(path = %path.display(), rows = table.rows, "Snapshot written");
            written.push(path);
        }
        Ok(written)
    }
}

impl Extractor for SourceExtractor {
    fn extract(&self, db: &StagingDb) -> ExtractResult<RawTables> {
        self.config.validate().map_err(ExtractError::InvalidConfig)?;

        let bookings = self.read_bookings(db)?;
        info!(
            source = %self.config.bookings_path.display(),
            rows = bookings.rows,
            "Bookings extracted"
        );

        let users = self.read_users(db)?;
        info!(
            source = %self.config.users.display(),
            rows = users.rows,
            "Users extracted"
        );

        let raw = RawTables::new(bookings, users);
        self.write_snapshot(db, &raw)?;
        Ok(raw)
    }
}
