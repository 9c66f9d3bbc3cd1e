//! Load configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Relational sink settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// DuckDB database file
    pub path: PathBuf,
}

/// Load stage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Directory receiving one delimited file per table
    pub output_dir: PathBuf,
    /// Field delimiter of the output files
    pub delimiter: char,
    /// Optional database sink, written after the files
    pub database: Option<DatabaseConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/transform"),
            delimiter: ';',
            database: None,
        }
    }
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Also load into a DuckDB database
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = Some(DatabaseConfig { path: path.into() });
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.output_dir.as_os_str().is_empty() {
            return Err("Output directory must not be empty".to_string());
        }
        crate::extract::delimiter_byte(self.delimiter)?;
        if let Some(db) = &self.database {
            if db.path.as_os_str().is_empty() {
                return Err("Database path must not be empty".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoadConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("data/transform"));
        assert_eq!(config.delimiter, ';');
        assert!(config.database.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_database_from_toml() {
        let config: LoadConfig = toml::from_str(
            r#"
            output_dir = "out"
            [database]
            path = "warehouse.duckdb"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.database,
            Some(DatabaseConfig {
                path: PathBuf::from("warehouse.duckdb")
            })
        );
    }

    #[test]
    fn test_validation() {
        assert!(LoadConfig::new().with_output_dir("").validate().is_err());
        assert!(LoadConfig::new().with_delimiter('"').validate().is_err());
        assert!(LoadConfig::new().with_database("").validate().is_err());
    }
}
