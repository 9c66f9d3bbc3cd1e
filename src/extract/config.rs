//! Extract configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Cell values read as missing unless configured otherwise
pub const DEFAULT_NULL_VALUES: &[&str] = &["", "NA", "NULL", "NaN", "nan", "None"];

/// Default users endpoint
pub const DEFAULT_USERS_URL: &str = "https://jsonplaceholder.typicode.com/users";

/// Where user records come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsersSource {
    /// HTTP endpoint returning a JSON array of user objects
    Url(String),
    /// Delimited text file
    Path(PathBuf),
}

impl Default for UsersSource {
    fn default() -> Self {
        Self::Url(DEFAULT_USERS_URL.to_string())
    }
}

impl UsersSource {
    /// Display string for logs and reports
    pub fn display(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Path(path) => path.display().to_string(),
        }
    }
}

/// Extract stage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Bookings file
    pub bookings_path: PathBuf,
    /// Bookings field delimiter
    pub bookings_delimiter: char,
    /// Users source
    pub users: UsersSource,
    /// Users field delimiter, when read from a file
    pub users_delimiter: char,
    /// Cell values read as missing
    pub null_values: Vec<String>,
    /// Timeout for the users request
    pub http_timeout_secs: u64,
    /// Directory for raw snapshots; none disables them
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            bookings_path: PathBuf::from("data/hotel_bookings.csv"),
            bookings_delimiter: ',',
            users: UsersSource::default(),
            users_delimiter: ',',
            null_values: DEFAULT_NULL_VALUES.iter().map(|s| s.to_string()).collect(),
            http_timeout_secs: 30,
            snapshot_dir: Some(PathBuf::from("data/extract")),
        }
    }
}

impl ExtractConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bookings file
    pub fn with_bookings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.bookings_path = path.into();
        self
    }

    /// Read users from a URL
    pub fn with_users_url(mut self, url: impl Into<String>) -> Self {
        self.users = UsersSource::Url(url.into());
        self
    }

    /// Read users from a delimited file
    pub fn with_users_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.users = UsersSource::Path(path.into());
        self
    }

    /// Set or disable the snapshot directory
    pub fn with_snapshot_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.snapshot_dir = dir;
        self
    }

    pub fn with_http_timeout_secs(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bookings_path.as_os_str().is_empty() {
            return Err("Bookings path must not be empty".to_string());
        }
        delimiter_byte(self.bookings_delimiter)?;
        delimiter_byte(self.users_delimiter)?;
        match &self.users {
            UsersSource::Url(url) if url.is_empty() => {
                return Err("Users URL must not be empty".to_string());
            }
            UsersSource::Path(path) if path.as_os_str().is_empty() => {
                return Err("Users path must not be empty".to_string());
            }
            _ => {}
        }
        if self.http_timeout_secs == 0 {
            return Err("HTTP timeout must be at least one second".to_string());
        }
        Ok(())
    }
}

/// Convert a configured delimiter to the single byte the reader expects
pub fn delimiter_byte(delimiter: char) -> Result<u8, String> {
    if delimiter.is_ascii() && delimiter != '"' && delimiter != '\n' {
        Ok(delimiter as u8)
    } else {
        Err(format!("Unsupported delimiter '{delimiter}'"))
    }
}
