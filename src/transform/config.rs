//! Transform configuration types
//!
//! Table shapes are passed into the dimension builder and fact assembler as
//! values rather than baked into them, so each component only sees the
//! column lists it consumes.

use serde::{Deserialize, Serialize};

/// Transform stage configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Seed for agent imputation; OS entropy when absent
    pub seed: Option<u64>,
    /// Output table shapes
    pub schema: SchemaConfig,
    /// Input columns kept as text regardless of their values
    pub text_columns: TextColumns,
}

impl TransformConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the imputation seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_schema(mut self, schema: SchemaConfig) -> Self {
        self.schema = schema;
        self
    }
}

/// Input columns that keep their text form.
///
/// Every other input column is typed from its values: whole numbers, then
/// finite numbers, then text. Identifiers such as phone numbers and user
/// names would lose leading zeros if typed as numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextColumns {
    pub bookings: Vec<String>,
    pub users: Vec<String>,
}

impl Default for TextColumns {
    fn default() -> Self {
        Self {
            bookings: to_strings(&[
                "hotel",
                "arrival_date_month",
                "meal",
                "country",
                "market_segment",
                "distribution_channel",
                "reserved_room_type",
                "assigned_room_type",
                "deposit_type",
                "customer_type",
                "reservation_status",
                "reservation_status_date",
            ]),
            users: to_strings(&[
                "name", "username", "email", "phone", "website", "address", "company",
            ]),
        }
    }
}

/// A dimension keyed by a sequential surrogate id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSpec {
    /// Output table name
    pub table: String,
    /// Surrogate key column
    pub id_column: String,
    /// Natural key columns, projected in this order
    pub key_columns: Vec<String>,
}

impl DimensionSpec {
    pub fn new(table: &str, id_column: &str, key_columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            id_column: id_column.to_string(),
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// The date dimension, keyed by the `YYYYMMDD` encoding of the date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateDimensionSpec {
    pub table: String,
    pub id_column: String,
    pub date_column: String,
}

/// A plain column projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub table: String,
    pub columns: Vec<String>,
}

/// The fact table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSpec {
    pub table: String,
    /// Surrogate key column, prepended to `columns`
    pub id_column: String,
    /// Declared fact columns, deduplicated as a full tuple
    pub columns: Vec<String>,
}

/// Shapes of every output table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub companies: DimensionSpec,
    pub hotels: DimensionSpec,
    pub meals: DimensionSpec,
    pub dates: DateDimensionSpec,
    pub users: ProjectionSpec,
    pub facts: FactSpec,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            companies: DimensionSpec::new(
                "dim_companies",
                "company_id",
                &["company_name", "company_catchPhrase", "company_bs"],
            ),
            hotels: DimensionSpec::new("dim_hotels", "hotel_id", &["hotel"]),
            meals: DimensionSpec::new("dim_meals", "meal_id", &["meal"]),
            dates: DateDimensionSpec {
                table: "dim_dates".to_string(),
                id_column: "arrival_date_id".to_string(),
                date_column: "arrival_date".to_string(),
            },
            users: ProjectionSpec {
                table: "dim_users".to_string(),
                columns: to_strings(&[
                    "id",
                    "name",
                    "username",
                    "email",
                    "email_valid",
                    "phone",
                    "website",
                    "street",
                    "suite",
                    "city",
                    "zipcode",
                    "geo_lat",
                    "geo_lng",
                    "company_id",
                ]),
            },
            facts: FactSpec {
                table: "fact_bookings".to_string(),
                id_column: "booking_id".to_string(),
                columns: to_strings(&[
                    "hotel_id",
                    "is_canceled",
                    "lead_time",
                    "arrival_date_id",
                    "arrival_date_week_number",
                    "stays_in_weekend_nights",
                    "stays_in_week_nights",
                    "adults",
                    "children",
                    "babies",
                    "meal_id",
                    "country",
                    "market_segment",
                    "distribution_channel",
                    "is_repeated_guest",
                    "previous_cancellations",
                    "previous_bookings_not_canceled",
                    "reserved_room_type",
                    "assigned_room_type",
                    "booking_changes",
                    "deposit_type",
                    "agent_id",
                    "company",
                    "days_in_waiting_list",
                    "customer_type",
                    "adr",
                    "required_car_parking_spaces",
                    "total_of_special_requests",
                    "reservation_status",
                    "reservation_status_date",
                ]),
            },
        }
    }
}

impl SchemaConfig {
    /// Output table names in load order
    pub fn table_names(&self) -> [&str; 6] {
        [
            self.companies.table.as_str(),
            self.hotels.table.as_str(),
            self.meals.table.as_str(),
            self.dates.table.as_str(),
            self.users.table.as_str(),
            self.facts.table.as_str(),
        ]
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for spec in [&self.companies, &self.hotels, &self.meals] {
            if spec.key_columns.is_empty() {
                return Err(format!("Dimension '{}' has no key columns", spec.table));
            }
            if spec.id_column.is_empty() {
                return Err(format!("Dimension '{}' has no id column", spec.table));
            }
        }
        if self.users.columns.is_empty() {
            return Err(format!("Table '{}' has no columns", self.users.table));
        }
        if self.facts.columns.is_empty() {
            return Err(format!("Table '{}' has no columns", self.facts.table));
        }
        if self.facts.columns.contains(&self.facts.id_column) {
            return Err(format!(
                "Fact column list must not contain the surrogate key '{}'",
                self.facts.id_column
            ));
        }

        let names = self.table_names();
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err("Output table names must not be empty".to_string());
            }
            if names[..i].contains(name) {
                return Err(format!("Output table name '{name}' is used twice"));
            }
        }
        Ok(())
    }
}

fn to_strings(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_is_valid() {
        let schema = SchemaConfig::default();
        assert!(schema.validate().is_ok());
        assert_eq!(
            schema.table_names(),
            [
                "dim_companies",
                "dim_hotels",
                "dim_meals",
                "dim_dates",
                "dim_users",
                "fact_bookings"
            ]
        );
    }

    #[test]
    fn test_validation_errors() {
        let mut schema = SchemaConfig::default();
        schema.meals.key_columns.clear();
        assert!(schema.validate().unwrap_err().contains("dim_meals"));

        let mut schema = SchemaConfig::default();
        schema.hotels.table = "dim_meals".to_string();
        assert!(schema.validate().unwrap_err().contains("used twice"));

        let mut schema = SchemaConfig::default();
        schema.facts.columns.push("booking_id".to_string());
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TransformConfig = toml::from_str("seed = 7").unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.schema, SchemaConfig::default());
        assert!(config.text_columns.users.contains(&"phone".to_string()));
    }

    #[test]
    fn test_text_columns_override() {
        let config: TransformConfig =
            toml::from_str("[text_columns]\nusers = [\"username\"]").unwrap();
        assert_eq!(config.text_columns.users, ["username"]);
        assert_eq!(config.text_columns.bookings, TextColumns::default().bookings);
    }
}
