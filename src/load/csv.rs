//! Delimited text writer

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use super::error::{LoadError, LoadResult};
use crate::staging::{StagingDb, quote_ident, quote_literal};

/// Write a staged table with a header row, returning the SHA-256 of the file
pub fn write_table(db: &StagingDb, table: &str, path: &Path, delimiter: u8) -> LoadResult<String> {
    write_query(db, &format!("SELECT * FROM {}", quote_ident(table)), path, delimiter)
}

/// Write the result of `select_sql` with a header row, returning the
/// SHA-256 of the file.
///
/// The file is written next to `path` under a temporary name and renamed
/// into place once complete. The temporary file never outlives a failure.
pub fn write_query(
    db: &StagingDb,
    select_sql: &str,
    path: &Path,
    delimiter: u8,
) -> LoadResult<String> {
    let tmp = temp_path(path);
    let result = copy_out(db, select_sql, &tmp, path, delimiter);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn copy_out(
    db: &StagingDb,
    select_sql: &str,
    tmp: &Path,
    path: &Path,
    delimiter: u8,
) -> LoadResult<String> {
    let delimiter = char::from(delimiter).to_string();
    db.execute_batch(&format!(
        "COPY ({select_sql}) TO {} (FORMAT CSV, HEADER, DELIMITER {});",
        quote_literal(&tmp.to_string_lossy()),
        quote_literal(&delimiter)
    ))?;

    let bytes = fs::read(tmp).map_err(|e| LoadError::io_with_path(tmp, e))?;
    fs::rename(tmp, path).map_err(|e| LoadError::io_with_path(path, e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Table written");
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
