//! Data-quality counters for recovered anomalies

use serde::{Deserialize, Serialize};

/// What the transform absorbed instead of failing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualityReport {
    /// Arrival dates whose parts did not form a calendar date
    pub unparseable_arrival_dates: usize,
    /// Reservation status dates that did not parse as DD/MM/YYYY
    pub unparseable_status_dates: usize,
    /// Missing countries filled with "Unknown"
    pub countries_filled_unknown: usize,
    /// "Unknown" countries replaced by the agent's most frequent country
    pub countries_backfilled: usize,
    /// Missing agents filled by weighted draws
    pub agents_imputed: usize,
    /// Meal codes rewritten from "Undefined"
    pub meals_rewritten: usize,
    /// Exact duplicate booking rows dropped
    pub duplicate_bookings_dropped: usize,
    /// Coordinates that failed numeric coercion
    pub invalid_coordinates: usize,
    /// E-mail addresses failing the shape check
    pub invalid_emails: usize,
    /// Bookings left out of the fact table for lack of an arrival date
    pub bookings_without_arrival_date: usize,
}

impl DataQualityReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total anomalies recovered as missing values or flags
    pub fn recovered_anomalies(&self) -> usize {
        self.unparseable_arrival_dates
            + self.unparseable_status_dates
            + self.invalid_coordinates
            + self.invalid_emails
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovered_anomalies_total() {
        let report = DataQualityReport {
            unparseable_arrival_dates: 1,
            invalid_emails: 2,
            invalid_coordinates: 3,
            agents_imputed: 10,
            ..Default::default()
        };
        assert_eq!(report.recovered_anomalies(), 6);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(DataQualityReport::new()).unwrap();
        assert!(json.get("agentsImputed").is_some());
    }
}
