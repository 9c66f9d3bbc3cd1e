//! Booking normalizer
//!
//! Standardizes dates, cleans categorical fields and imputes missing values
//! in the staged bookings table. Steps run in a fixed order:
//!
//! 1. arrival date assembly and reservation status date parsing
//! 2. `meal` rewrite and `country` fill (these commute)
//! 3. agent imputation from the observed agent distribution
//! 4. country back-fill from each agent's most frequent country
//! 5. exact-duplicate removal

use chrono::{Month, NaiveDate};
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tracing::{debug, warn};

use super::error::TransformResult;
use super::quality::DataQualityReport;
use crate::staging::{ColumnType, ROW_ID, StagingDb, quote_ident, quote_literal};

pub const HOTEL: &str = "hotel";
pub const MEAL: &str = "meal";
pub const COUNTRY: &str = "country";
pub const AGENT: &str = "agent";
pub const ARRIVAL_DATE: &str = "arrival_date";
pub const ARRIVAL_DATE_YEAR: &str = "arrival_date_year";
pub const ARRIVAL_DATE_MONTH: &str = "arrival_date_month";
pub const ARRIVAL_DATE_DAY: &str = "arrival_date_day_of_month";
pub const RESERVATION_STATUS_DATE: &str = "reservation_status_date";

/// Placeholder for a missing country
pub const UNKNOWN_COUNTRY: &str = "Unknown";
/// Meal code meaning "no meal package"
pub const SELF_CATERING: &str = "SC";
const UNDEFINED_MEAL: &str = "Undefined";

/// Format of `reservation_status_date`
pub const STATUS_DATE_FORMAT: &str = "%d/%m/%Y";

const COUNTRY_MODES: &str = "__country_modes";

/// Normalizes the bookings table
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingNormalizer;

impl BookingNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Run every normalization step on `table` in place. `rng` drives agent
    /// imputation only.
    pub fn normalize<R: Rng + ?Sized>(
        &self,
        db: &StagingDb,
        table: &str,
        rng: &mut R,
        report: &mut DataQualityReport,
    ) -> TransformResult<()> {
        let rows_in = db.row_count(table)?;

        standardize_dates(db, table, report)?;
        rewrite_undefined_meals(db, table, report)?;
        fill_unknown_countries(db, table, report)?;
        impute_agents(db, table, rng, report)?;
        backfill_countries(db, table, report)?;
        drop_duplicates(db, table, report)?;

        debug!(
            rows_in,
            rows_out = db.row_count(table)?,
            agents_imputed = report.agents_imputed,
            countries_backfilled = report.countries_backfilled,
            "Bookings normalized"
        );
        Ok(())
    }
}

/// Parse a month given as an English name, a 3-letter abbreviation or a number
pub fn parse_month(value: &str) -> Option<u32> {
    let value = value.trim();
    value
        .parse::<Month>()
        .ok()
        .map(|m| m.number_from_month())
        .or_else(|| parse_whole(value).and_then(|n| u32::try_from(n).ok()))
}

/// Parse a whole number, accepting a float form with no fraction
pub fn parse_whole(value: &str) -> Option<i64> {
    let value = value.trim();
    value.parse::<i64>().ok().or_else(|| {
        let f = value.parse::<f64>().ok()?;
        (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
    })
}

/// Assemble a calendar date from year, month and day parts
pub fn assemble_arrival_date(
    year: Option<&str>,
    month: Option<&str>,
    day: Option<&str>,
) -> Option<NaiveDate> {
    let year = i32::try_from(parse_whole(year?)?).ok()?;
    let month = parse_month(month?)?;
    let day = u32::try_from(parse_whole(day?)?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a reservation status date strictly as day/month/year
pub fn parse_status_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), STATUS_DATE_FORMAT).ok()
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Replace the arrival date parts with a single `arrival_date` column and
/// parse `reservation_status_date`. Invalid dates become missing.
pub fn standardize_dates(
    db: &StagingDb,
    table: &str,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    let parts = db.text_rows(table, &[ARRIVAL_DATE_YEAR, ARRIVAL_DATE_MONTH, ARRIVAL_DATE_DAY])?;
    let statuses = db.text_column(table, RESERVATION_STATUS_DATE)?;

    let mut unparseable = 0;
    let arrival_dates: Vec<(i64, Option<String>)> = parts
        .into_iter()
        .map(|(row_id, cells)| {
            let date = assemble_arrival_date(
                cells[0].as_deref(),
                cells[1].as_deref(),
                cells[2].as_deref(),
            );
            if date.is_none() {
                unparseable += 1;
            }
            (row_id, date.map(iso))
        })
        .collect();

    let mut unparseable_status = 0;
    let status_dates: Vec<(i64, Option<String>)> = statuses
        .into_iter()
        .map(|(row_id, value)| {
            let date = value.as_deref().and_then(parse_status_date);
            if value.is_some() && date.is_none() {
                unparseable_status += 1;
            }
            (row_id, date.map(iso))
        })
        .collect();

    db.write_column(table, ARRIVAL_DATE, ColumnType::Date, arrival_dates)?;
    db.drop_columns(table, &[ARRIVAL_DATE_YEAR, ARRIVAL_DATE_MONTH, ARRIVAL_DATE_DAY])?;
    db.write_column(table, RESERVATION_STATUS_DATE, ColumnType::Date, status_dates)?;

    if unparseable > 0 || unparseable_status > 0 {
        warn!(
            arrival_dates = unparseable,
            status_dates = unparseable_status,
            "Unparseable dates coerced to missing"
        );
    }
    report.unparseable_arrival_dates += unparseable;
    report.unparseable_status_dates += unparseable_status;
    Ok(())
}

/// Rewrite the `"Undefined"` meal code to `"SC"`
pub fn rewrite_undefined_meals(
    db: &StagingDb,
    table: &str,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    db.require_columns(table, &[MEAL])?;
    report.meals_rewritten += db.execute(&format!(
        "UPDATE {t} SET {meal} = {sc} WHERE {meal} = {undefined}",
        t = quote_ident(table),
        meal = quote_ident(MEAL),
        sc = quote_literal(SELF_CATERING),
        undefined = quote_literal(UNDEFINED_MEAL),
    ))?;
    Ok(())
}

/// Fill missing countries with `"Unknown"`
pub fn fill_unknown_countries(
    db: &StagingDb,
    table: &str,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    db.require_columns(table, &[COUNTRY])?;
    report.countries_filled_unknown += db.execute(&format!(
        "UPDATE {t} SET {country} = {unknown} WHERE {country} IS NULL",
        t = quote_ident(table),
        country = quote_ident(COUNTRY),
        unknown = quote_literal(UNKNOWN_COUNTRY),
    ))?;
    Ok(())
}

/// Observed agents with their counts, in order of first appearance
pub fn observed_agents(db: &StagingDb, table: &str) -> TransformResult<Vec<(String, u64)>> {
    db.require_columns(table, &[AGENT])?;
    let mut stmt = db.connection().prepare(&format!(
        "SELECT CAST({agent} AS VARCHAR), count(*) FROM {t}
         WHERE {agent} IS NOT NULL
         GROUP BY {agent}
         ORDER BY min({row_id})",
        agent = quote_ident(AGENT),
        t = quote_ident(table),
        row_id = quote_ident(ROW_ID),
    ))?;
    let agents = stmt
        .query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, u64::try_from(count).unwrap_or(0)))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(agents)
}

/// Fill each missing agent with an independent draw from the relative
/// frequencies of the observed agents.
///
/// Candidates are ordered by first appearance and missing rows are visited
/// in row order, so a seeded `rng` reproduces the same draws for the same
/// input.
pub fn impute_agents<R: Rng + ?Sized>(
    db: &StagingDb,
    table: &str,
    rng: &mut R,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    let candidates = observed_agents(db, table)?;
    let missing: Vec<i64> = db
        .text_column(table, AGENT)?
        .into_iter()
        .filter(|(_, agent)| agent.is_none())
        .map(|(row_id, _)| row_id)
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    let distribution = match WeightedIndex::new(candidates.iter().map(|(_, n)| *n)) {
        Ok(distribution) => distribution,
        Err(e) => {
            warn!(
                missing = missing.len(),
                error = %e,
                "No observed agents to impute from; leaving agents missing"
            );
            return Ok(());
        }
    };

    let draws: Vec<(i64, String)> = missing
        .iter()
        .map(|row_id| (*row_id, candidates[distribution.sample(&mut *rng)].0.clone()))
        .collect();
    let imputed = db.update_rows(table, AGENT, draws)?;

    debug!(imputed, distinct_agents = candidates.len(), "Agents imputed");
    report.agents_imputed += imputed;
    Ok(())
}

/// Most frequent country per agent, ties broken by the lexicographically
/// smallest country. Agents come back in ascending text order.
pub fn country_modes_by_agent(
    db: &StagingDb,
    table: &str,
) -> TransformResult<Vec<(String, String)>> {
    build_country_modes(db, table)?;
    let rows = db
        .connection()
        .prepare(&format!(
            "SELECT CAST({agent} AS VARCHAR) AS a, {country} FROM {modes} ORDER BY a",
            agent = quote_ident(AGENT),
            country = quote_ident(COUNTRY),
            modes = quote_ident(COUNTRY_MODES),
        ))?
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>();
    db.drop_table(COUNTRY_MODES)?;
    Ok(rows?)
}

fn build_country_modes(db: &StagingDb, table: &str) -> TransformResult<()> {
    db.require_columns(table, &[AGENT, COUNTRY])?;
    db.execute_batch(&format!(
        "CREATE OR REPLACE TABLE {modes} AS
         SELECT {agent}, {country} FROM (
             SELECT {agent}, {country}, count(*) AS n FROM {t}
             WHERE {agent} IS NOT NULL AND {country} IS NOT NULL
             GROUP BY {agent}, {country}
         )
         QUALIFY row_number() OVER (PARTITION BY {agent} ORDER BY n DESC, {country} ASC) = 1;",
        modes = quote_ident(COUNTRY_MODES),
        agent = quote_ident(AGENT),
        country = quote_ident(COUNTRY),
        t = quote_ident(table),
    ))?;
    Ok(())
}

/// Replace `"Unknown"` countries of rows with an agent by that agent's most
/// frequent country. Modes come from one snapshot taken before any
/// replacement, so row order does not matter.
pub fn backfill_countries(
    db: &StagingDb,
    table: &str,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    build_country_modes(db, table)?;
    let backfilled = db.execute(&format!(
        "UPDATE {t} SET {country} = m.{country}
         FROM {modes} m
         WHERE {t}.{agent} = m.{agent}
           AND {t}.{country} = {unknown}
           AND m.{country} <> {unknown}",
        t = quote_ident(table),
        modes = quote_ident(COUNTRY_MODES),
        agent = quote_ident(AGENT),
        country = quote_ident(COUNTRY),
        unknown = quote_literal(UNKNOWN_COUNTRY),
    ));
    db.drop_table(COUNTRY_MODES)?;
    report.countries_backfilled += backfilled?;
    Ok(())
}

/// Drop exact-duplicate rows, keeping the first occurrence
pub fn drop_duplicates(
    db: &StagingDb,
    table: &str,
    report: &mut DataQualityReport,
) -> TransformResult<()> {
    let before = db.row_count(table)?;
    let columns: Vec<String> = db
        .columns(table)?
        .iter()
        .filter(|c| c.as_str() != ROW_ID)
        .map(|c| quote_ident(c))
        .collect();
    if columns.is_empty() {
        return Ok(());
    }

    db.replace_table(
        table,
        &format!(
            "SELECT * FROM {t}
             QUALIFY row_number() OVER (PARTITION BY {cols} ORDER BY {row_id}) = 1
             ORDER BY {row_id}",
            t = quote_ident(table),
            cols = columns.join(", "),
            row_id = quote_ident(ROW_ID),
        ),
    )?;
    report.duplicate_bookings_dropped += before - db.row_count(table)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TextColumns;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const T: &str = "stg_bookings";

    type Row<'a> = (
        &'a str,
        &'a str,
        &'a str,
        &'a str,
        &'a str,
        Option<&'a str>,
        Option<&'a str>,
        &'a str,
    );

    fn bookings(rows: Vec<Row>) -> StagingDb {
        let db = StagingDb::memory().unwrap();
        db.create_text_table(
            T,
            &[
                HOTEL,
                ARRIVAL_DATE_YEAR,
                ARRIVAL_DATE_MONTH,
                ARRIVAL_DATE_DAY,
                MEAL,
                COUNTRY,
                AGENT,
                RESERVATION_STATUS_DATE,
            ],
        )
        .unwrap();
        let mut appender = db.text_appender(T).unwrap();
        for (hotel, year, month, day, meal, country, agent, status) in rows {
            let text = |s: &str| Some(s.to_string());
            appender
                .append(vec![
                    text(hotel),
                    text(year),
                    text(month),
                    text(day),
                    text(meal),
                    country.and_then(text),
                    agent.and_then(text),
                    text(status),
                ])
                .unwrap();
        }
        appender.finish().unwrap();
        db.type_columns(T, &TextColumns::default().bookings).unwrap();
        db
    }

    fn column(db: &StagingDb, name: &str) -> Vec<Option<String>> {
        db.text_column(T, name)
            .unwrap()
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }

    fn some(values: &[&str]) -> Vec<Option<String>> {
        values.iter().map(|v| Some(v.to_string())).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_month_variants() {
        assert_eq!(parse_month("July"), Some(7));
        assert_eq!(parse_month("jul"), Some(7));
        assert_eq!(parse_month("12"), Some(12));
        assert_eq!(parse_month(" 2 "), Some(2));
        assert_eq!(parse_month("Juli"), None);
    }

    #[test]
    fn test_assemble_arrival_date() {
        assert_eq!(
            assemble_arrival_date(Some("2015"), Some("July"), Some("1")),
            Some(date(2015, 7, 1))
        );
        assert_eq!(
            assemble_arrival_date(Some("2015.0"), Some("7"), Some("1")),
            Some(date(2015, 7, 1))
        );
        assert_eq!(
            assemble_arrival_date(Some("2015"), Some("February"), Some("30")),
            None
        );
        assert_eq!(assemble_arrival_date(None, Some("July"), Some("1")), None);
    }

    #[test]
    fn test_parse_status_date_is_strict() {
        assert_eq!(parse_status_date("01/07/2015"), Some(date(2015, 7, 1)));
        assert_eq!(parse_status_date("2015-07-01"), None);
        assert_eq!(parse_status_date("31/02/2015"), None);
    }

    #[test]
    fn test_standardize_dates_replaces_parts() {
        let db = bookings(vec![
            ("Resort Hotel", "2015", "July", "1", "BB", Some("PRT"), Some("9"), "01/07/2015"),
            ("Resort Hotel", "2015", "June", "31", "BB", Some("PRT"), Some("9"), "garbage"),
        ]);
        let mut report = DataQualityReport::new();
        standardize_dates(&db, T, &mut report).unwrap();

        for part in [ARRIVAL_DATE_YEAR, ARRIVAL_DATE_MONTH, ARRIVAL_DATE_DAY] {
            assert!(!db.has_column(T, part).unwrap());
        }
        assert_eq!(db.column_type(T, ARRIVAL_DATE).unwrap(), "DATE");
        assert_eq!(db.column_type(T, RESERVATION_STATUS_DATE).unwrap(), "DATE");
        assert_eq!(column(&db, ARRIVAL_DATE), [Some("2015-07-01".to_string()), None]);
        assert_eq!(
            column(&db, RESERVATION_STATUS_DATE),
            [Some("2015-07-01".to_string()), None]
        );
        assert_eq!(report.unparseable_arrival_dates, 1);
        assert_eq!(report.unparseable_status_dates, 1);
    }

    #[test]
    fn test_meal_rewrite_and_country_fill_commute() {
        let rows = vec![
            ("Resort Hotel", "2015", "July", "1", "Undefined", None, Some("9"), "01/07/2015"),
            ("City Hotel", "2015", "July", "2", "HB", Some("GBR"), Some("9"), "01/07/2015"),
        ];

        let a = bookings(rows.clone());
        let mut r1 = DataQualityReport::new();
        rewrite_undefined_meals(&a, T, &mut r1).unwrap();
        fill_unknown_countries(&a, T, &mut r1).unwrap();

        let b = bookings(rows);
        let mut r2 = DataQualityReport::new();
        fill_unknown_countries(&b, T, &mut r2).unwrap();
        rewrite_undefined_meals(&b, T, &mut r2).unwrap();

        assert_eq!(column(&a, MEAL), column(&b, MEAL));
        assert_eq!(column(&a, COUNTRY), column(&b, COUNTRY));
        assert_eq!(r1, r2);
        assert_eq!(r1.meals_rewritten, 1);
        assert_eq!(r1.countries_filled_unknown, 1);
        assert_eq!(column(&a, MEAL), some(&["SC", "HB"]));
        assert_eq!(column(&a, COUNTRY), some(&["Unknown", "GBR"]));
    }

    #[test]
    fn test_impute_agents_only_draws_observed_values() {
        let db = bookings(vec![
            ("Resort Hotel", "2015", "July", "1", "BB", Some("PRT"), Some("9"), "01/07/2015"),
            ("Resort Hotel", "2015", "July", "2", "BB", Some("PRT"), Some("240"), "01/07/2015"),
            ("Resort Hotel", "2015", "July", "3", "BB", Some("PRT"), None, "01/07/2015"),
            ("Resort Hotel", "2015", "July", "4", "BB", Some("PRT"), None, "01/07/2015"),
        ]);
        assert_eq!(
            observed_agents(&db, T).unwrap(),
            [("9".to_string(), 1), ("240".to_string(), 1)]
        );

        let mut rng = StdRng::seed_from_u64(11);
        let mut report = DataQualityReport::new();
        impute_agents(&db, T, &mut rng, &mut report).unwrap();

        assert_eq!(report.agents_imputed, 2);
        assert_eq!(db.column_type(T, AGENT).unwrap(), "BIGINT");
        for agent in column(&db, AGENT) {
            assert!(matches!(agent.as_deref(), Some("9") | Some("240")));
        }
    }

    #[test]
    fn test_impute_agents_without_observations_leaves_missing() {
        let db = bookings(vec![(
            "Resort Hotel",
            "2015",
            "July",
            "1",
            "BB",
            Some("PRT"),
            None,
            "01/07/2015",
        )]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut report = DataQualityReport::new();
        impute_agents(&db, T, &mut rng, &mut report).unwrap();
        assert_eq!(column(&db, AGENT), [None]);
        assert_eq!(report.agents_imputed, 0);
    }

    #[test]
    fn test_impute_agents_is_reproducible_with_seed() {
        let agents: Vec<Option<String>> = (0..50)
            .map(|i| (i % 3 != 0).then(|| (i % 7).to_string()))
            .collect();
        let days: Vec<String> = (0..50).map(|i| (1 + i % 28).to_string()).collect();

        let run = |seed| {
            let rows: Vec<Row> = (0..50)
                .map(|i| {
                    (
                        "City Hotel",
                        "2016",
                        "May",
                        days[i].as_str(),
                        "BB",
                        Some("PRT"),
                        agents[i].as_deref(),
                        "01/05/2016",
                    )
                })
                .collect();
            let db = bookings(rows);
            let mut rng = StdRng::seed_from_u64(seed);
            impute_agents(&db, T, &mut rng, &mut DataQualityReport::new()).unwrap();
            column(&db, AGENT)
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn test_imputed_distribution_matches_source() {
        // 3:1 ratio of agent 1 to agent 2, then many missing agents
        let mut rows: Vec<Row> = Vec::new();
        for i in 0..400 {
            let agent = if i % 4 == 3 { "2" } else { "1" };
            let (year, day, date) = ("2016", "1", "01/05/2016");
            rows.push(("City Hotel", year, "May", day, "BB", Some("PRT"), Some(agent), date));
        }
        for _ in 0..4000 {
            rows.push(("City Hotel", "2016", "May", "1", "BB", Some("PRT"), None, "01/05/2016"));
        }
        let db = bookings(rows);
        let mut rng = StdRng::seed_from_u64(2024);
        impute_agents(&db, T, &mut rng, &mut DataQualityReport::new()).unwrap();

        let agents = column(&db, AGENT);
        let imputed = &agents[400..];
        let ones = imputed.iter().filter(|v| v.as_deref() == Some("1")).count();
        let share = ones as f64 / imputed.len() as f64;
        assert!((share - 0.75).abs() < 0.03, "share of agent 1 was {share}");
    }

    #[test]
    fn test_country_modes_break_ties_lexicographically() {
        let db = bookings(vec![
            ("City Hotel", "2016", "May", "1", "BB", Some("PRT"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "2", "BB", Some("ESP"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "3", "BB", Some("GBR"), Some("8"), "01/05/2016"),
        ]);
        assert_eq!(
            country_modes_by_agent(&db, T).unwrap(),
            [
                ("7".to_string(), "ESP".to_string()),
                ("8".to_string(), "GBR".to_string())
            ]
        );
        assert!(db.columns(COUNTRY_MODES).is_err());
    }

    #[test]
    fn test_backfill_countries_only_touches_unknown() {
        let db = bookings(vec![
            ("City Hotel", "2016", "May", "1", "BB", Some("PRT"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "2", "BB", Some("PRT"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "3", "BB", Some("Unknown"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "4", "BB", Some("FRA"), Some("7"), "01/05/2016"),
            ("City Hotel", "2016", "May", "5", "BB", Some("Unknown"), Some("99"), "01/05/2016"),
        ]);
        let mut report = DataQualityReport::new();
        backfill_countries(&db, T, &mut report).unwrap();
        assert_eq!(column(&db, COUNTRY), some(&["PRT", "PRT", "PRT", "FRA", "Unknown"]));
        assert_eq!(report.countries_backfilled, 1);
    }

    #[test]
    fn test_drop_duplicates_keeps_first_occurrence() {
        let db = bookings(vec![
            ("City Hotel", "2016", "May", "1", "BB", Some("PRT"), None, "01/05/2016"),
            ("Resort Hotel", "2016", "May", "1", "BB", Some("PRT"), None, "01/05/2016"),
            ("City Hotel", "2016", "May", "1", "BB", Some("PRT"), None, "01/05/2016"),
        ]);
        let mut report = DataQualityReport::new();
        drop_duplicates(&db, T, &mut report).unwrap();
        assert_eq!(column(&db, HOTEL), some(&["City Hotel", "Resort Hotel"]));
        assert_eq!(report.duplicate_bookings_dropped, 1);
    }

    #[test]
    fn test_normalize_example_row() {
        let db = bookings(vec![
            ("Resort Hotel", "2015", "July", "1", "Undefined", None, None, "01/07/2015"),
            ("Resort Hotel", "2015", "July", "2", "BB", Some("PRT"), Some("304"), "02/07/2015"),
            ("Resort Hotel", "2015", "July", "2", "BB", Some("PRT"), Some("304"), "02/07/2015"),
        ]);
        let mut rng = StdRng::seed_from_u64(5);
        let mut report = DataQualityReport::new();
        BookingNormalizer::new()
            .normalize(&db, T, &mut rng, &mut report)
            .unwrap();

        assert_eq!(db.row_count(T).unwrap(), 2);
        assert_eq!(report.duplicate_bookings_dropped, 1);
        assert_eq!(column(&db, ARRIVAL_DATE)[0].as_deref(), Some("2015-07-01"));
        assert_eq!(column(&db, MEAL)[0].as_deref(), Some("SC"));
        // the only observed agent is 304, whose most frequent country is PRT
        assert_eq!(column(&db, AGENT)[0].as_deref(), Some("304"));
        assert_eq!(column(&db, COUNTRY)[0].as_deref(), Some("PRT"));
    }
}
