//! Delimited text reader

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::{ExtractError, ExtractResult};
use crate::staging::{StagedTable, StagingDb};

/// Land a headed delimited stream in `table`, every cell as text.
///
/// Cells are kept verbatim. A cell whose trimmed text is one of
/// `null_values` is stored as missing.
pub fn land_delimited<R: Read>(
    db: &StagingDb,
    reader: R,
    table: &str,
    delimiter: u8,
    null_values: &[String],
) -> ExtractResult<StagedTable> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()
        .map_err(|e| ExtractError::csv(table, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    db.create_text_table(table, &headers)?;

    let mut appender = db.text_appender(table)?;
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| ExtractError::csv(table, format!("record {row}: {e}")))?;
        appender.append(record.iter().map(|cell| cell_text(cell, null_values)).collect())?;
    }
    appender.finish()?;

    Ok(StagedTable::refresh(db, table)?)
}

/// Land a delimited file in `table`
pub fn land_delimited_path(
    db: &StagingDb,
    path: &Path,
    table: &str,
    delimiter: u8,
    null_values: &[String],
) -> ExtractResult<StagedTable> {
    if !path.exists() {
        return Err(ExtractError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    land_delimited(db, file, table, delimiter, null_values)
}

/// A raw cell, or `None` when it is a null token
pub fn cell_text(raw: &str, null_values: &[String]) -> Option<String> {
    let trimmed = raw.trim();
    if null_values.iter().any(|token| token == trimmed) {
        None
    } else {
        Some(raw.to_string())
    }
}
