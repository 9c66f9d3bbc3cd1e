//! Fact assembler and referential checks

use tracing::{debug, warn};

use super::bookings::AGENT;
use super::config::{FactSpec, SchemaConfig};
use super::error::{TransformError, TransformResult};
use super::keys::number_distinct;
use super::quality::DataQualityReport;
use crate::staging::{StagedTable, StagingDb, quote_ident};

/// Column the agent is published under in the fact table
pub const AGENT_ID: &str = "agent_id";

/// Assemble the fact table from bookings carrying dimension ids.
///
/// Rows without an arrival date id are left out. The rest are projected
/// onto the fact columns, deduplicated and numbered in first-appearance
/// order.
pub fn assemble_facts(
    db: &StagingDb,
    bookings: &str,
    spec: &FactSpec,
    arrival_id_column: &str,
    report: &mut DataQualityReport,
) -> TransformResult<StagedTable> {
    db.require_columns(bookings, &[arrival_id_column])?;
    let rows_in = db.row_count(bookings)?;
    let arrival_id = quote_ident(arrival_id_column);

    let without_date = db.query_count(&format!(
        "SELECT count(*) FROM {} WHERE {arrival_id} IS NULL",
        quote_ident(bookings)
    ))?;
    if without_date > 0 {
        warn!(
            rows = without_date,
            "Bookings without an arrival date left out of the fact table"
        );
    }
    report.bookings_without_arrival_date += without_date;

    if db.has_column(bookings, AGENT)? && !db.has_column(bookings, AGENT_ID)? {
        db.rename_column(bookings, AGENT, AGENT_ID)?;
    }

    let filter = format!("{arrival_id} IS NOT NULL");
    let rows = number_distinct(
        db,
        bookings,
        &spec.table,
        &spec.id_column,
        &spec.columns,
        Some(&filter),
    )?;
    debug!(rows_in, rows_out = rows, "Fact rows deduplicated");
    Ok(StagedTable::new(spec.table.as_str(), rows))
}

/// Check that every value of `column` exists in `dimension.id_column`.
/// A missing value never resolves.
pub fn check_references(
    db: &StagingDb,
    table: &str,
    column: &str,
    dimension: &str,
    id_column: &str,
) -> TransformResult<()> {
    db.require_columns(table, &[column])?;
    db.require_columns(dimension, &[id_column])?;
    let col = quote_ident(column);
    let mut stmt = db.connection().prepare(&format!(
        "SELECT CAST(f.{col} AS VARCHAR) FROM {table} f
         WHERE f.{col} IS NULL
            OR NOT EXISTS (SELECT 1 FROM {dimension} d WHERE d.{id} = f.{col})
         ORDER BY f.rowid
         LIMIT 1",
        table = quote_ident(table),
        dimension = quote_ident(dimension),
        id = quote_ident(id_column),
    ))?;
    let dangling = stmt
        .query_map([], |row| row.get::<_, Option<String>>(0))?
        .next()
        .transpose()?;

    match dangling {
        None => Ok(()),
        Some(value) => Err(TransformError::ReferentialIntegrity {
            table: table.to_string(),
            column: column.to_string(),
            value: value.unwrap_or_else(|| "null".to_string()),
            dimension: dimension.to_string(),
        }),
    }
}

/// Check every foreign key of the fact table and of the users dimension
pub fn validate_integrity(db: &StagingDb, schema: &SchemaConfig) -> TransformResult<()> {
    let facts = schema.facts.table.as_str();
    for (id_column, dimension) in [
        (&schema.hotels.id_column, &schema.hotels.table),
        (&schema.meals.id_column, &schema.meals.table),
        (&schema.dates.id_column, &schema.dates.table),
    ] {
        check_references(db, facts, id_column, dimension, id_column)?;
    }
    check_references(
        db,
        &schema.users.table,
        &schema.companies.id_column,
        &schema.companies.table,
        &schema.companies.id_column,
    )
}
