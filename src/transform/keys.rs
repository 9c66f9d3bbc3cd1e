//! Surrogate key assignment
//!
//! Shared by every sequential dimension and by the fact table: project the
//! key columns, deduplicate in first-appearance order and number the
//! distinct tuples from 1.

use super::error::{TransformError, TransformResult};
use crate::staging::{ROW_ID, StagingDb, quote_ident};

const FIRST_ROW: &str = "__first_row";

/// Create `target` from the distinct tuples of `columns` in `source`,
/// numbered 1..N by first appearance under `id_column`.
///
/// `filter` is an optional SQL predicate over `source`. Returns the number
/// of rows created.
pub fn number_distinct<S: AsRef<str>>(
    db: &StagingDb,
    source: &str,
    target: &str,
    id_column: &str,
    columns: &[S],
    filter: Option<&str>,
) -> TransformResult<usize> {
    db.require_columns(source, columns)?;
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c.as_ref())).collect();
    let cols = cols.join(", ");
    let first = quote_ident(FIRST_ROW);

    db.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {target} AS
         SELECT row_number() OVER (ORDER BY {first}) AS {id}, {cols}
         FROM (
             SELECT {cols}, min({row_id}) AS {first} FROM {source}
             {filter}
             GROUP BY ALL
         )
         ORDER BY {first};",
        target = quote_ident(target),
        id = quote_ident(id_column),
        row_id = quote_ident(ROW_ID),
        source = quote_ident(source),
        filter = filter.map(|f| format!("WHERE {f}")).unwrap_or_default(),
    ))?;
    Ok(db.row_count(target)?)
}

/// Build a dimension from the distinct key tuples of `source`.
///
/// The dimension holds `id_column` first, then `key_columns`. Returns its
/// row count.
pub fn assign_surrogate_keys<S: AsRef<str>>(
    db: &StagingDb,
    source: &str,
    dimension: &str,
    id_column: &str,
    key_columns: &[S],
) -> TransformResult<usize> {
    number_distinct(db, source, dimension, id_column, key_columns, None)
}

/// Append `id_column` to `source` holding each row's surrogate id from
/// `dimension`. Missing key values match missing key values.
///
/// Every key tuple must resolve; the first row that does not fails the join.
pub fn join_surrogate_key<S: AsRef<str>>(
    db: &StagingDb,
    source: &str,
    dimension: &str,
    key_columns: &[S],
    id_column: &str,
) -> TransformResult<()> {
    db.require_columns(source, key_columns)?;
    let src = quote_ident(source);
    let id = quote_ident(id_column);
    let matches: Vec<String> = key_columns
        .iter()
        .map(|c| {
            let c = quote_ident(c.as_ref());
            format!("{src}.{c} IS NOT DISTINCT FROM d.{c}")
        })
        .collect();

    db.execute_batch(&format!(
        "ALTER TABLE {src} ADD COLUMN {id} BIGINT;
         UPDATE {src} SET {id} = d.{id} FROM {dim} d WHERE {matches};",
        dim = quote_ident(dimension),
        matches = matches.join(" AND "),
    ))?;

    let unresolved =
        db.query_count(&format!("SELECT count(*) FROM {src} WHERE {id} IS NULL"))?;
    if unresolved > 0 {
        let row_id = quote_ident(ROW_ID);
        let row = db.query_count(&format!(
            "SELECT count(*) FROM {src}
             WHERE {row_id} < (SELECT min({row_id}) FROM {src} WHERE {id} IS NULL)"
        ))?;
        return Err(TransformError::UnresolvedKey {
            dimension: dimension.to_string(),
            row,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookings(db: &StagingDb, table: &str, rows: &[[Option<&str>; 2]]) {
        db.create_text_table(table, &["hotel", "meal"]).unwrap();
        let mut appender = db.text_appender(table).unwrap();
        for row in rows {
            appender
                .append(row.iter().map(|c| c.map(str::to_string)).collect())
                .unwrap();
        }
        appender.finish().unwrap();
    }

    fn staged() -> StagingDb {
        let db = StagingDb::memory().unwrap();
        bookings(
            &db,
            "stg",
            &[
                [Some("Resort Hotel"), Some("BB")],
                [Some("City Hotel"), Some("HB")],
                [Some("Resort Hotel"), None],
                [Some("City Hotel"), Some("BB")],
            ],
        );
        db
    }

    fn rows(db: &StagingDb, table: &str, columns: &[&str]) -> Vec<Vec<Option<String>>> {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| format!("CAST({} AS VARCHAR)", quote_ident(c)))
            .collect();
        let mut stmt = db
            .connection()
            .prepare(&format!("SELECT {} FROM {}", cols.join(", "), quote_ident(table)))
            .unwrap();
        stmt.query_map([], |row| {
            (0..columns.len())
                .map(|i| row.get::<_, Option<String>>(i))
                .collect::<Result<Vec<_>, _>>()
        })
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
    }

    fn text(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    #[test]
    fn test_keys_follow_first_appearance() {
        let db = staged();
        let count =
            assign_surrogate_keys(&db, "stg", "dim_hotels", "hotel_id", &["hotel"]).unwrap();

        assert_eq!(count, 2);
        assert_eq!(db.columns("dim_hotels").unwrap(), ["hotel_id", "hotel"]);
        assert_eq!(db.column_type("dim_hotels", "hotel_id").unwrap(), "BIGINT");
        assert_eq!(
            rows(&db, "dim_hotels", &["hotel_id", "hotel"]),
            [text(&["1", "Resort Hotel"]), text(&["2", "City Hotel"])]
        );
    }

    #[test]
    fn test_join_appends_ids_and_matches_missing_keys() {
        let db = staged();
        assign_surrogate_keys(&db, "stg", "dim_meals", "meal_id", &["meal"]).unwrap();
        join_surrogate_key(&db, "stg", "dim_meals", &["meal"], "meal_id").unwrap();

        assert_eq!(
            rows(&db, "dim_meals", &["meal_id", "meal"]),
            [
                text(&["1", "BB"]),
                text(&["2", "HB"]),
                vec![Some("3".to_string()), None]
            ]
        );
        let ids: Vec<_> = db
            .text_column("stg", "meal_id")
            .unwrap()
            .into_iter()
            .map(|(_, id)| id)
            .collect();
        assert_eq!(ids, text(&["1", "2", "3", "1"]));
    }

    #[test]
    fn test_unresolved_key_fails() {
        let db = staged();
        assign_surrogate_keys(&db, "stg", "dim_hotels", "hotel_id", &["hotel"]).unwrap();
        bookings(
            &db,
            "other",
            &[[Some("City Hotel"), None], [Some("Airport Hotel"), None]],
        );

        let err = join_surrogate_key(&db, "other", "dim_hotels", &["hotel"], "hotel_id")
            .unwrap_err();
        assert_eq!(
            err,
            TransformError::UnresolvedKey {
                dimension: "dim_hotels".to_string(),
                row: 1
            }
        );
    }

    #[test]
    fn test_number_distinct_with_filter() {
        let db = staged();
        let count = number_distinct(
            &db,
            "stg",
            "booked_meals",
            "id",
            &["hotel", "meal"],
            Some("meal IS NOT NULL"),
        )
        .unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            rows(&db, "booked_meals", &["id", "meal"]),
            [text(&["1", "BB"]), text(&["2", "HB"]), text(&["3", "BB"])]
        );
    }

    #[test]
    fn test_assignment_is_deterministic() {
        let first = staged();
        let second = staged();
        assign_surrogate_keys(&first, "stg", "d", "id", &["hotel", "meal"]).unwrap();
        assign_surrogate_keys(&second, "stg", "d", "id", &["hotel", "meal"]).unwrap();
        assert_eq!(
            rows(&first, "d", &["id", "hotel", "meal"]),
            rows(&second, "d", &["id", "hotel", "meal"])
        );
        assert_eq!(first.row_count("d").unwrap(), 4);
    }
}
