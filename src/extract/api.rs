//! Users from an HTTP JSON endpoint

use serde_json::Value as JsonValue;

use super::error::{ExtractError, ExtractResult};
use crate::staging::{StagedTable, StagingDb};

/// Land users from a JSON array of objects in `table`.
///
/// Columns follow first appearance across all objects. Scalars are kept
/// as text; nested objects and arrays are kept as JSON text, the same
/// shape as a file source.
pub fn users_from_json(
    db: &StagingDb,
    body: &str,
    source_name: &str,
    table: &str,
) -> ExtractResult<StagedTable> {
    let parsed: JsonValue = serde_json::from_str(body)
        .map_err(|e| ExtractError::invalid_response(source_name, e.to_string()))?;
    let records = parsed
        .as_array()
        .ok_or_else(|| ExtractError::invalid_response(source_name, "expected a JSON array"))?;

    let mut columns: Vec<String> = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let object = record.as_object().ok_or_else(|| {
            ExtractError::invalid_response(source_name, format!("record {i} is not an object"))
        })?;
        for key in object.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    db.create_text_table(table, &columns)?;
    let mut appender = db.text_appender(table)?;
    for record in records {
        appender.append(
            columns
                .iter()
                .map(|column| record.get(column).and_then(json_text))
                .collect(),
        )?;
    }
    appender.finish()?;

    Ok(StagedTable::refresh(db, table)?)
}

fn json_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Fetch the users response body with a blocking client
#[cfg(feature = "api-backend")]
pub fn fetch_users(url: &str, timeout_secs: u64) -> ExtractResult<String> {
    use std::time::Duration;

    use tracing::debug;

    let http_error = |e: reqwest::Error| ExtractError::Http {
        url: url.to_string(),
        message: e.to_string(),
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(http_error)?;

    debug!(url, "Requesting users");
    let response = client.get(url).send().map_err(http_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response.text().map_err(http_error)
}
