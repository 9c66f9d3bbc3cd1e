//! Staging database implementation
//!
//! Every staged table carries a `row_id BIGINT` column holding the row's
//! position in its source. Rebuilds order by it and insertion order is
//! preserved, so plain scans return rows in source order.

use duckdb::types::Value as SqlValue;
use duckdb::{Connection, Statement, params_from_iter};
use tracing::debug;

use super::error::{StagingError, StagingResult};

/// Source position column present in every staged input table
pub const ROW_ID: &str = "row_id";

const SCRATCH: &str = "__staged_values";
const NEXT: &str = "__next";

/// SQL type of a derived column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    BigInt,
    Double,
    Date,
    Varchar,
}

impl ColumnType {
    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::BigInt => "BIGINT",
            Self::Double => "DOUBLE",
            Self::Date => "DATE",
            Self::Varchar => "VARCHAR",
        }
    }
}

/// Quote an identifier
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Embedded DuckDB database holding the raw, working and output tables of
/// one run
pub struct StagingDb {
    conn: Connection,
    path: Option<String>,
}

impl StagingDb {
    /// Open or create a staging database at the given path
    pub fn open(path: &str) -> StagingResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("SET preserve_insertion_order = true;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database
    pub fn memory() -> StagingResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("SET preserve_insertion_order = true;")?;
        Ok(Self { conn, path: None })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run one statement, returning the number of rows it changed
    pub fn execute(&self, sql: &str) -> StagingResult<usize> {
        Ok(self.conn.execute(sql, [])?)
    }

    pub fn execute_batch(&self, sql: &str) -> StagingResult<()> {
        Ok(self.conn.execute_batch(sql)?)
    }

    /// Run a query returning a single integer
    pub fn query_count(&self, sql: &str) -> StagingResult<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Column names of a table, in declaration order
    pub fn columns(&self, table: &str) -> StagingResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_catalog = current_database() AND table_schema = 'main'
               AND table_name = ?
             ORDER BY ordinal_position",
        )?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(StagingError::MissingTable(table.to_string()));
        }
        Ok(columns)
    }

    pub fn has_column(&self, table: &str, column: &str) -> StagingResult<bool> {
        Ok(self.columns(table)?.iter().any(|c| c == column))
    }

    /// Fail with `MissingColumn` on the first absent column
    pub fn require_columns<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> StagingResult<()> {
        let present = self.columns(table)?;
        for column in columns {
            if !present.iter().any(|c| c == column.as_ref()) {
                return Err(StagingError::MissingColumn {
                    table: table.to_string(),
                    column: column.as_ref().to_string(),
                });
            }
        }
        Ok(())
    }

    /// SQL type name of a column
    pub fn column_type(&self, table: &str, column: &str) -> StagingResult<String> {
        let mut stmt = self.conn.prepare(
            "SELECT data_type FROM information_schema.columns
             WHERE table_catalog = current_database() AND table_schema = 'main'
               AND table_name = ? AND column_name = ?",
        )?;
        let found = stmt
            .query_map(duckdb::params![table, column], |row| row.get::<_, String>(0))?
            .next()
            .transpose()?;
        found.ok_or_else(|| StagingError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        })
    }

    pub fn row_count(&self, table: &str) -> StagingResult<usize> {
        self.query_count(&format!("SELECT count(*) FROM {}", quote_ident(table)))
    }

    /// Create `table` with `row_id` and one VARCHAR column per name,
    /// replacing any table of that name
    pub fn create_text_table<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
    ) -> StagingResult<()> {
        let definitions: Vec<String> = std::iter::once(format!("{} BIGINT", quote_ident(ROW_ID)))
            .chain(
                columns
                    .iter()
                    .map(|c| format!("{} VARCHAR", quote_ident(c.as_ref()))),
            )
            .collect();
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} ({});",
            quote_ident(table),
            definitions.join(", ")
        ))?;
        Ok(())
    }

    /// Appender for a table made by [`create_text_table`](Self::create_text_table).
    ///
    /// Rows are inserted in one transaction, committed by
    /// [`TextAppender::finish`] and rolled back if the appender is dropped.
    pub fn text_appender(&self, table: &str) -> StagingResult<TextAppender<'_>> {
        let next_row = i64::try_from(self.row_count(table)?).unwrap_or(i64::MAX);
        let width = self.columns(table)?.len();
        let placeholders = vec!["?"; width].join(", ");
        let insert = self.conn.prepare(&format!(
            "INSERT INTO {} VALUES ({placeholders})",
            quote_ident(table)
        ))?;
        self.conn.execute_batch("BEGIN TRANSACTION;")?;
        Ok(TextAppender {
            conn: &self.conn,
            insert,
            next_row,
            open: true,
        })
    }

    /// Read columns as text, in row order
    pub fn text_rows<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
    ) -> StagingResult<Vec<(i64, Vec<Option<String>>)>> {
        self.require_columns(table, columns)?;
        let select: Vec<String> = std::iter::once(quote_ident(ROW_ID))
            .chain(
                columns
                    .iter()
                    .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c.as_ref()))),
            )
            .collect();
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            select.join(", "),
            quote_ident(table),
            quote_ident(ROW_ID)
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], |row| {
                let row_id: i64 = row.get(0)?;
                let cells = (1..=columns.len())
                    .map(|i| row.get::<_, Option<String>>(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((row_id, cells))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Read one column as text, in row order
    pub fn text_column(
        &self,
        table: &str,
        column: &str,
    ) -> StagingResult<Vec<(i64, Option<String>)>> {
        Ok(self
            .text_rows(table, &[column])?
            .into_iter()
            .map(|(row_id, mut cells)| (row_id, cells.pop().flatten()))
            .collect())
    }

    /// Write derived columns keyed by `row_id`.
    ///
    /// Values are text cast to each column's type. An existing column of
    /// the same name is replaced in place; new columns are appended. Rows
    /// absent from `rows` get missing values.
    pub fn write_columns<I>(
        &self,
        table: &str,
        columns: &[(&str, ColumnType)],
        rows: I,
    ) -> StagingResult<()>
    where
        I: IntoIterator<Item = (i64, Vec<Option<String>>)>,
    {
        let slots: Vec<String> = (0..columns.len()).map(|i| format!("v{i}")).collect();
        self.stage_values(&slots, rows)?;

        let derived = |name: &str| {
            columns
                .iter()
                .position(|(c, _)| *c == name)
                .map(|i| {
                    format!(
                        "CAST(s.{} AS {}) AS {}",
                        quote_ident(&slots[i]),
                        columns[i].1.sql_name(),
                        quote_ident(name)
                    )
                })
        };

        let existing = self.columns(table)?;
        let mut select: Vec<String> = existing
            .iter()
            .map(|c| derived(c).unwrap_or_else(|| format!("t.{}", quote_ident(c))))
            .collect();
        select.extend(
            columns
                .iter()
                .filter(|(c, _)| !existing.iter().any(|e| e == c))
                .filter_map(|(c, _)| derived(c)),
        );

        let sql = format!(
            "SELECT {} FROM {} t LEFT JOIN {} s ON t.{row_id} = s.{row_id} ORDER BY t.{row_id}",
            select.join(", "),
            quote_ident(table),
            quote_ident(SCRATCH),
            row_id = quote_ident(ROW_ID),
        );
        self.replace_table(table, &sql)?;
        self.drop_table(SCRATCH)
    }

    /// Write one derived column keyed by `row_id`
    pub fn write_column<I>(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
        values: I,
    ) -> StagingResult<()>
    where
        I: IntoIterator<Item = (i64, Option<String>)>,
    {
        self.write_columns(
            table,
            &[(column, column_type)],
            values.into_iter().map(|(row_id, value)| (row_id, vec![value])),
        )
    }

    /// Overwrite a column for the given rows, keeping the column's type.
    /// Returns the number of rows changed.
    pub fn update_rows<I>(&self, table: &str, column: &str, values: I) -> StagingResult<usize>
    where
        I: IntoIterator<Item = (i64, String)>,
    {
        let column_type = self.column_type(table, column)?;
        self.stage_values(
            &["v0"],
            values.into_iter().map(|(row_id, value)| (row_id, vec![Some(value)])),
        )?;
        let changed = self.execute(&format!(
            "UPDATE {t} SET {c} = CAST(s.v0 AS {column_type}) FROM {s} s WHERE {t}.{r} = s.{r}",
            t = quote_ident(table),
            c = quote_ident(column),
            s = quote_ident(SCRATCH),
            r = quote_ident(ROW_ID),
        ))?;
        self.drop_table(SCRATCH)?;
        Ok(changed)
    }

    fn stage_values<S, I>(&self, slots: &[S], rows: I) -> StagingResult<()>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (i64, Vec<Option<String>>)>,
    {
        self.create_text_table(SCRATCH, slots)?;
        let mut appender = self.text_appender(SCRATCH)?;
        for (row_id, cells) in rows {
            appender.append_keyed(row_id, cells)?;
        }
        appender.finish()?;
        Ok(())
    }

    /// Replace `table` with the result of `select_sql`
    pub fn replace_table(&self, table: &str, select_sql: &str) -> StagingResult<()> {
        let next = quote_ident(NEXT);
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {next} AS {select_sql};
             DROP TABLE {table};
             ALTER TABLE {next} RENAME TO {table};",
            table = quote_ident(table),
        ))?;
        Ok(())
    }

    /// Copy a staged table under a new name, in row order
    pub fn copy_table(&self, source: &str, target: &str) -> StagingResult<usize> {
        self.conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM {} ORDER BY {};",
            quote_ident(target),
            quote_ident(source),
            quote_ident(ROW_ID)
        ))?;
        self.row_count(target)
    }

    pub fn drop_columns(&self, table: &str, columns: &[&str]) -> StagingResult<()> {
        for column in columns {
            self.conn.execute_batch(&format!(
                "ALTER TABLE {} DROP COLUMN {};",
                quote_ident(table),
                quote_ident(column)
            ))?;
        }
        Ok(())
    }

    pub fn rename_column(&self, table: &str, from: &str, to: &str) -> StagingResult<()> {
        self.conn.execute_batch(&format!(
            "ALTER TABLE {} RENAME COLUMN {} TO {};",
            quote_ident(table),
            quote_ident(from),
            quote_ident(to)
        ))?;
        Ok(())
    }

    pub fn drop_table(&self, table: &str) -> StagingResult<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(table)))?;
        Ok(())
    }

    /// Type the text columns of `table` from their values.
    ///
    /// Columns named in `text_columns` stay VARCHAR. Every other column
    /// becomes BIGINT when each present value is a whole number, DOUBLE
    /// when each is a finite number, and stays VARCHAR otherwise.
    pub fn type_columns(
        &self,
        table: &str,
        text_columns: &[String],
    ) -> StagingResult<Vec<(String, ColumnType)>> {
        let mut typed = Vec::new();
        let mut select = Vec::new();
        for column in self.columns(table)? {
            let ident = quote_ident(&column);
            if column == ROW_ID {
                select.push(ident);
                continue;
            }
            let column_type = if text_columns.contains(&column) {
                ColumnType::Varchar
            } else {
                self.infer_type(table, &ident)?
            };
            select.push(match column_type {
                ColumnType::Varchar => ident,
                other => format!("CAST(trim({ident}) AS {}) AS {ident}", other.sql_name()),
            });
            typed.push((column, column_type));
        }

        self.replace_table(
            table,
            &format!(
                "SELECT {} FROM {} ORDER BY {}",
                select.join(", "),
                quote_ident(table),
                quote_ident(ROW_ID)
            ),
        )?;
        debug!(table, columns = typed.len(), "Columns typed");
        Ok(typed)
    }

    fn infer_type(&self, table: &str, ident: &str) -> StagingResult<ColumnType> {
        let (not_whole, not_finite): (i64, i64) = self.conn.query_row(
            &format!(
                "SELECT
                   count(*) FILTER (WHERE {ident} IS NOT NULL AND (
                     NOT regexp_full_match(trim({ident}), '[+-]?[0-9]+')
                     OR TRY_CAST(trim({ident}) AS BIGINT) IS NULL)),
                   count(*) FILTER (WHERE {ident} IS NOT NULL AND (
                     TRY_CAST(trim({ident}) AS DOUBLE) IS NULL
                     OR NOT isfinite(TRY_CAST(trim({ident}) AS DOUBLE))))
                 FROM {}",
                quote_ident(table)
            ),
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(if not_whole == 0 {
            ColumnType::BigInt
        } else if not_finite == 0 {
            ColumnType::Double
        } else {
            ColumnType::Varchar
        })
    }
}

/// Streams rows into a text table, numbering them from the table's
/// current size
pub struct TextAppender<'a> {
    conn: &'a Connection,
    insert: Statement<'a>,
    next_row: i64,
    open: bool,
}

impl TextAppender<'_> {
    /// Append one row of cells; `None` is a missing value
    pub fn append(&mut self, cells: Vec<Option<String>>) -> StagingResult<()> {
        let row_id = self.next_row;
        self.append_keyed(row_id, cells)
    }

    fn append_keyed(&mut self, row_id: i64, cells: Vec<Option<String>>) -> StagingResult<()> {
        let values = std::iter::once(SqlValue::BigInt(row_id)).chain(
            cells
                .into_iter()
                .map(|cell| cell.map_or(SqlValue::Null, SqlValue::Text)),
        );
        self.insert.execute(params_from_iter(values))?;
        self.next_row = row_id + 1;
        Ok(())
    }

    /// Commit the appended rows
    pub fn finish(mut self) -> StagingResult<()> {
        self.open = false;
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }
}

impl Drop for TextAppender<'_> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.conn.execute_batch("ROLLBACK;");
        }
    }
}
