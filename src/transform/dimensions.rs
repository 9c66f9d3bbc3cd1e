//! Dimension builder
//!
//! Derives the dimension tables from the normalized inputs and joins their
//! surrogate keys back onto the source rows. Construction order is
//! companies, hotels, meals, dates, then the users projection, which needs
//! `company_id`.

use tracing::debug;

use super::config::{DateDimensionSpec, DimensionSpec, SchemaConfig};
use super::error::TransformResult;
use super::keys::{assign_surrogate_keys, join_surrogate_key};
use crate::staging::{ROW_ID, StagedTable, StagingDb, quote_ident};

/// The five dimension tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub companies: StagedTable,
    pub hotels: StagedTable,
    pub meals: StagedTable,
    pub dates: StagedTable,
    pub users: StagedTable,
}

/// SQL expression for the `YYYYMMDD` encoding of a date column
pub fn date_id(date_column: &str) -> String {
    let date = quote_ident(date_column);
    format!("(year({date}) * 10000 + month({date}) * 100 + day({date}))")
}

/// Builds dimensions for a given schema
pub struct DimensionBuilder<'a> {
    schema: &'a SchemaConfig,
}

impl<'a> DimensionBuilder<'a> {
    pub fn new(schema: &'a SchemaConfig) -> Self {
        Self { schema }
    }

    /// Build every dimension from the normalized `bookings` and `users`
    /// tables. Both gain the surrogate key columns of their dimensions.
    pub fn build(
        &self,
        db: &StagingDb,
        bookings: &str,
        users: &str,
    ) -> TransformResult<Dimensions> {
        let companies = self.build_sequential(db, &self.schema.companies, users)?;
        let hotels = self.build_sequential(db, &self.schema.hotels, bookings)?;
        let meals = self.build_sequential(db, &self.schema.meals, bookings)?;
        let dates = self.build_dates(db, &self.schema.dates, bookings)?;
        let users = self.project_users(db, users)?;

        debug!(
            companies = companies.rows,
            hotels = hotels.rows,
            meals = meals.rows,
            dates = dates.rows,
            users = users.rows,
            "Dimensions built"
        );

        Ok(Dimensions {
            companies,
            hotels,
            meals,
            dates,
            users,
        })
    }

    /// Build a sequentially keyed dimension and join its id onto `source`
    pub fn build_sequential(
        &self,
        db: &StagingDb,
        spec: &DimensionSpec,
        source: &str,
    ) -> TransformResult<StagedTable> {
        let rows =
            assign_surrogate_keys(db, source, &spec.table, &spec.id_column, &spec.key_columns)?;
        join_surrogate_key(db, source, &spec.table, &spec.key_columns, &spec.id_column)?;
        Ok(StagedTable::new(spec.table.as_str(), rows))
    }

    /// Build the date dimension. Ids derive from the date itself, so rows
    /// without a date get a missing id and no dimension row.
    pub fn build_dates(
        &self,
        db: &StagingDb,
        spec: &DateDimensionSpec,
        source: &str,
    ) -> TransformResult<StagedTable> {
        db.require_columns(source, &[spec.date_column.as_str()])?;
        let src = quote_ident(source);
        let id = quote_ident(&spec.id_column);
        let date = quote_ident(&spec.date_column);

        db.execute_batch(&format!(
            "ALTER TABLE {src} ADD COLUMN {id} BIGINT;
             UPDATE {src} SET {id} = {expr};
             CREATE OR REPLACE TABLE {dim} AS
             SELECT {id}, {date} FROM (
                 SELECT {id}, {date}, min({row_id}) AS first_row FROM {src}
                 WHERE {id} IS NOT NULL
                 GROUP BY {id}, {date}
             )
             ORDER BY first_row;",
            expr = date_id(&spec.date_column),
            dim = quote_ident(&spec.table),
            row_id = quote_ident(ROW_ID),
        ))?;
        Ok(StagedTable::refresh(db, &spec.table)?)
    }

    /// Project users onto the declared column list, in row order
    pub fn project_users(&self, db: &StagingDb, users: &str) -> TransformResult<StagedTable> {
        let spec = &self.schema.users;
        db.require_columns(users, &spec.columns)?;
        let columns: Vec<String> = spec.columns.iter().map(|c| quote_ident(c)).collect();
        db.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT {} FROM {} ORDER BY {};",
            quote_ident(&spec.table),
            columns.join(", "),
            quote_ident(users),
            quote_ident(ROW_ID),
        ))?;
        Ok(StagedTable::refresh(db, &spec.table)?)
    }
}
