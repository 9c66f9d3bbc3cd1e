//! User normalizer
//!
//! Flattens the nested `address` and `company` fields and standardizes the
//! contact fields of the staged users table. A malformed structured field
//! aborts the whole stage before any column is rewritten.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use super::error::{TransformError, TransformResult};
use super::literal::parse_literal;
use super::quality::DataQualityReport;
use crate::staging::{ColumnType, StagingDb};

pub const ADDRESS: &str = "address";
pub const COMPANY: &str = "company";
pub const PHONE: &str = "phone";
pub const EMAIL: &str = "email";
pub const EMAIL_VALID: &str = "email_valid";
pub const WEBSITE: &str = "website";
pub const NAME: &str = "name";
pub const USERNAME: &str = "username";
pub const GEO_LAT: &str = "geo_lat";
pub const GEO_LNG: &str = "geo_lng";

/// Output column and path inside the address structure
const ADDRESS_FIELDS: &[(&str, &[&str])] = &[
    ("street", &["street"]),
    ("suite", &["suite"]),
    ("city", &["city"]),
    ("zipcode", &["zipcode"]),
    (GEO_LAT, &["geo", "lat"]),
    (GEO_LNG, &["geo", "lng"]),
];

/// Output column and key inside the company structure
const COMPANY_FIELDS: &[(&str, &[&str])] = &[
    ("company_name", &["name"]),
    ("company_catchPhrase", &["catchPhrase"]),
    ("company_bs", &["bs"]),
];

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

static EXTENSION_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[xX].*$").unwrap());

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").unwrap());

static NAME_DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9 ]").unwrap());

type Column = Vec<(i64, Option<String>)>;

/// Normalizes the users table
#[derive(Debug, Clone, Copy, Default)]
pub struct UserNormalizer;

impl UserNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Run every normalization step on `table` in place
    pub fn normalize(
        &self,
        db: &StagingDb,
        table: &str,
        report: &mut DataQualityReport,
    ) -> TransformResult<()> {
        let rows = db.row_count(table)?;
        let address = parse_structured_field(db, table, ADDRESS, ADDRESS_FIELDS)?;
        let company = parse_structured_field(db, table, COMPANY, COMPANY_FIELDS)?;
        write_flattened(db, table, ADDRESS, ADDRESS_FIELDS, address)?;
        write_flattened(db, table, COMPANY, COMPANY_FIELDS, company)?;

        rewrite_text(db, table, PHONE, |v| Some(standardize_phone(v)))?;
        rewrite_text(db, table, WEBSITE, |v| v.map(normalize_website))?;
        rewrite_text(db, table, NAME, |v| v.map(sanitize_name))?;
        rewrite_text(db, table, USERNAME, |v| v.map(sanitize_name))?;

        let mut invalid_emails = 0;
        let email_valid: Column = db
            .text_column(table, EMAIL)?
            .into_iter()
            .map(|(row_id, email)| {
                let valid = is_valid_email(email.as_deref());
                if !valid {
                    invalid_emails += 1;
                }
                (row_id, Some(valid.to_string()))
            })
            .collect();
        db.write_column(table, EMAIL_VALID, ColumnType::Boolean, email_valid)?;

        let mut invalid_coordinates = 0;
        for column in [GEO_LAT, GEO_LNG] {
            let coerced: Column = db
                .text_column(table, column)?
                .into_iter()
                .map(|(row_id, value)| {
                    let coordinate = value.as_deref().and_then(coerce_coordinate);
                    if value.is_some() && coordinate.is_none() {
                        invalid_coordinates += 1;
                    }
                    (row_id, coordinate.map(|f| f.to_string()))
                })
                .collect();
            db.write_column(table, column, ColumnType::Double, coerced)?;
        }

        if invalid_coordinates > 0 {
            warn!(invalid_coordinates, "Non-numeric coordinates coerced to missing");
        }
        report.invalid_emails += invalid_emails;
        report.invalid_coordinates += invalid_coordinates;

        debug!(rows, invalid_emails, "Users normalized");
        Ok(())
    }
}

fn rewrite_text(
    db: &StagingDb,
    table: &str,
    column: &str,
    rewrite: impl Fn(Option<&str>) -> Option<String>,
) -> TransformResult<()> {
    let values: Column = db
        .text_column(table, column)?
        .into_iter()
        .map(|(row_id, value)| (row_id, rewrite(value.as_deref())))
        .collect();
    db.write_column(table, column, ColumnType::Varchar, values)?;
    Ok(())
}

/// Parse every cell of a structured column into one text value per field.
///
/// Fails on the first row that does not parse or lacks a field; `row` in
/// the error is the 0-based position in the table.
pub fn parse_structured_field(
    db: &StagingDb,
    table: &str,
    column: &str,
    fields: &[(&str, &[&str])],
) -> TransformResult<Vec<(i64, Vec<Option<String>>)>> {
    db.text_column(table, column)?
        .into_iter()
        .enumerate()
        .map(|(row, (row_id, cell))| {
            let structure = parse_structured_cell(cell.as_deref(), column, row)?;
            let values = fields
                .iter()
                .map(|(_, path)| {
                    lookup_path(&structure, path).map(json_text).ok_or_else(|| {
                        let key = path.join(".");
                        TransformError::malformed(column, row, format!("missing key '{key}'"))
                    })
                })
                .collect::<TransformResult<Vec<_>>>()?;
            Ok((row_id, values))
        })
        .collect()
}

fn write_flattened(
    db: &StagingDb,
    table: &str,
    column: &str,
    fields: &[(&str, &[&str])],
    rows: Vec<(i64, Vec<Option<String>>)>,
) -> TransformResult<()> {
    let columns: Vec<(&str, ColumnType)> = fields
        .iter()
        .map(|(name, _)| (*name, ColumnType::Varchar))
        .collect();
    db.write_columns(table, &columns, rows)?;
    db.drop_columns(table, &[column])?;
    Ok(())
}

fn parse_structured_cell(
    cell: Option<&str>,
    column: &str,
    row: usize,
) -> TransformResult<JsonValue> {
    let text = cell.ok_or_else(|| TransformError::malformed(column, row, "missing value"))?;
    let parsed =
        parse_literal(text).map_err(|e| TransformError::malformed(column, row, e.to_string()))?;
    if !parsed.is_object() {
        return Err(TransformError::malformed(column, row, "not a dict"));
    }
    Ok(parsed)
}

fn lookup_path<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |current, key| current.get(key))
}

fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Standardize a phone number to `+1<digits>`.
///
/// The extension suffix (from the first `x`/`X`) is dropped and the rest
/// reduced to digits. An 11-digit number starting with `1` loses that `1`
/// before `+1` is prepended. A missing phone gives `+1`.
pub fn standardize_phone(phone: Option<&str>) -> String {
    let text = phone.unwrap_or_default();
    let without_extension = EXTENSION_SUFFIX.replace(text, "");
    let mut digits = NON_DIGIT.replace_all(&without_extension, "").into_owned();
    if digits.len() == 11 && digits.starts_with('1') {
        digits.remove(0);
    }
    format!("+1{digits}")
}

/// Check an e-mail address against the fixed shape pattern
pub fn is_valid_email(email: Option<&str>) -> bool {
    email.is_some_and(|s| EMAIL_REGEX.is_match(s))
}

/// Prefix `http://` unless the URL already has an http(s) scheme
pub fn normalize_website(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Keep only ASCII letters, digits and spaces
pub fn sanitize_name(name: &str) -> String {
    NAME_DISALLOWED.replace_all(name, "").into_owned()
}

/// Coerce a coordinate to a finite float; anything else gives `None`
pub fn coerce_coordinate(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}
