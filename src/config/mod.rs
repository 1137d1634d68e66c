//! Configuration management for realty-scout
//!
//! Configuration is loaded from a TOML file and then patched from environment
//! variables, so secrets such as the API token or the SMTP password do not
//! have to live in the file. The resulting [`Config`] is immutable and is
//! handed to the crawler, the store and the reporters at construction time.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Building-type attribute used by the listings API
pub const DEFAULT_BUILDING_TYPE_FIELD: &str = "Вид объекта";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Neither a schedule nor run-once mode was configured
    #[error("No schedule times configured and run_once is disabled; nothing to do")]
    EmptySchedule,

    /// A schedule entry is not a valid `HH:MM` time
    #[error("Invalid schedule time '{0}', expected HH:MM")]
    InvalidScheduleTime(String),

    /// Any other invalid value
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Listings API access
    pub api: ApiConfig,

    /// Property categories searched in every city
    pub categories: Vec<CategoryConfig>,

    /// Regions, each reported separately
    pub regions: Vec<RegionConfig>,

    /// When the job runs
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Listing store
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Report output
    #[serde(default)]
    pub reports: ReportConfig,

    /// Email delivery
    #[serde(default)]
    pub email: EmailConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listings API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL
    pub url: String,

    /// API user (usually an email address)
    #[serde(default)]
    pub user: String,

    /// API token
    #[serde(default)]
    pub token: String,

    /// Page size requested from the API
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Optional `nedvigimost_type` flag (1 = sale, 2 = rent, ...)
    #[serde(default)]
    pub nedvigimost_type: Option<u32>,

    /// Restrict each fetch to ads published during the previous day
    #[serde(default)]
    pub fetch_for_yesterday: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Pause before every category request, in milliseconds
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// Pause before retrying a rate-limited request, in milliseconds
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
}

/// One property category and its filtering rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryConfig {
    /// API category id
    pub id: u32,

    /// Display name
    pub name: String,

    /// Marker/legend color used by reports
    #[serde(default = "default_color")]
    pub color: String,

    /// Ad parameter holding the area for this category
    pub area_field: String,

    /// Minimum area passed to the API
    #[serde(default)]
    pub square_min: Option<f64>,

    /// Maximum area passed to the API
    #[serde(default)]
    pub square_max: Option<f64>,

    /// Whether the area range is sent as API query parameters
    #[serde(default = "default_true")]
    pub area_query_filter: bool,

    /// Ad parameter holding the building type
    #[serde(default = "default_building_type_field")]
    pub building_type_field: String,

    /// Building-type substrings that exclude an ad
    #[serde(default)]
    pub exclude_building_types: Vec<String>,

    /// Keywords that exclude an ad when found in its title or description
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

/// A geographic grouping of cities reported together
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionConfig {
    /// Region name used in subjects and file names
    pub name: String,

    /// City names passed to the API, searched in this order
    pub cities: Vec<String>,
}

/// Schedule configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ScheduleConfig {
    /// Daily local run times in `HH:MM`
    #[serde(default)]
    pub times: Vec<String>,

    /// Run one job immediately and exit
    #[serde(default)]
    pub run_once: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path
    pub sqlite_path: PathBuf,
}

/// Report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory receiving spreadsheets and maps
    pub output_dir: PathBuf,

    /// Remove previous reports at the start of every job
    #[serde(default = "default_true")]
    pub clean_on_start: bool,

    /// Geocode addresses whose ads carry no coordinates
    #[serde(default = "default_true")]
    pub geocode: bool,

    /// Nominatim-compatible search endpoint
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// User agent sent to the geocoder
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Email delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_server: String,

    /// SMTP port (STARTTLS)
    pub smtp_port: u16,

    /// Sender address, also the SMTP login
    #[serde(default)]
    pub sender: String,

    /// SMTP password
    #[serde(default)]
    pub password: String,

    /// Report recipient
    #[serde(default)]
    pub recipient: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn default_limit() -> u32 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_request_delay_ms() -> u64 {
    7000
}

fn default_rate_limit_backoff_ms() -> u64 {
    10_000
}

fn default_color() -> String {
    String::from("blue")
}

fn default_true() -> bool {
    true
}

fn default_building_type_field() -> String {
    DEFAULT_BUILDING_TYPE_FIELD.to_string()
}

fn default_geocoder_url() -> String {
    String::from("https://nominatim.openstreetmap.org/search")
}

fn default_user_agent() -> String {
    format!("realty-scout/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("data/realty.db"),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
            clean_on_start: true,
            geocode: true,
            geocoder_url: default_geocoder_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: String::from("smtp.mail.ru"),
            smtp_port: 587,
            sender: String::new(),
            password: String::new(),
            recipient: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a file, apply environment overrides and validate the result
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Patch secrets and deploy-specific values from the environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(user) = lookup("REALTY_API_USER") {
            self.api.user = user;
        }
        if let Some(token) = lookup("REALTY_API_TOKEN") {
            self.api.token = token;
        }
        if let Some(sender) = lookup("REALTY_EMAIL_SENDER") {
            self.email.sender = sender;
        }
        if let Some(password) = lookup("REALTY_EMAIL_PASSWORD") {
            self.email.password = password;
        }
        if let Some(recipient) = lookup("REALTY_EMAIL_RECIPIENT") {
            self.email.recipient = recipient;
        }
        if let Some(path) = lookup("REALTY_SQLITE_PATH") {
            self.database.sqlite_path = PathBuf::from(path);
        }
        if let Some(level) = lookup("REALTY_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.url.trim().is_empty() {
            return Err(ConfigError::Invalid("api.url must not be empty".into()));
        }

        if self.categories.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one category must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for category in &self.categories {
            if !seen.insert(category.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate category id {}",
                    category.id
                )));
            }
            if category.area_field.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "category {} has an empty area_field",
                    category.id
                )));
            }
        }

        if self.regions.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one region must be configured".into(),
            ));
        }

        if let Some(region) = self.regions.iter().find(|r| r.cities.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "region '{}' has no cities",
                region.name
            )));
        }

        self.schedule_times()?;
        if self.schedule.times.is_empty() && !self.schedule.run_once {
            return Err(ConfigError::EmptySchedule);
        }

        if self.email.smtp_port == 0 {
            return Err(ConfigError::Invalid("email.smtp_port must not be 0".into()));
        }

        Ok(())
    }

    /// Parse configured schedule times
    pub fn schedule_times(&self) -> Result<Vec<NaiveTime>, ConfigError> {
        self.schedule
            .times
            .iter()
            .map(|raw| {
                NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                    .map_err(|_| ConfigError::InvalidScheduleTime(raw.clone()))
            })
            .collect()
    }

    /// Find a category by API id
    pub fn category(&self, id: u32) -> Option<&CategoryConfig> {
        self.categories.iter().find(|c| c.id == id)
    }
}

impl ApiConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the pre-request delay as Duration
    #[must_use]
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Get the rate-limit backoff as Duration
    #[must_use]
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }
}

impl CategoryConfig {
    /// Create a category with default rules
    pub fn new(id: u32, name: impl Into<String>, area_field: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: default_color(),
            area_field: area_field.into(),
            square_min: None,
            square_max: None,
            area_query_filter: true,
            building_type_field: default_building_type_field(),
            exclude_building_types: Vec::new(),
            exclude_keywords: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [api]
        url = "https://ads-api.ru/main/api"
        user = "user@example.com"
        token = "file-token"
        nedvigimost_type = 1
        fetch_for_yesterday = true

        [[categories]]
        id = 7
        name = "Коммерческая недвижимость"
        color = "red"
        area_field = "Общая площадь"
        square_min = 50
        exclude_keywords = ["аренда"]

        [[categories]]
        id = 5
        name = "Земельные участки"
        color = "green"
        area_field = "Площадь"
        area_query_filter = false

        [[regions]]
        name = "Санкт-Петербург"
        cities = ["Санкт-Петербург", "Пушкин"]

        [schedule]
        times = ["09:00", "18:30"]
    "#;

    fn sample() -> Config {
        toml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_sample_config_is_valid() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.api.limit, 1000);
        assert_eq!(config.api.request_delay(), Duration::from_secs(7));
        assert_eq!(config.api.rate_limit_backoff(), Duration::from_secs(10));
        assert_eq!(config.email.smtp_port, 587);
    }

    #[test]
    fn test_category_defaults() {
        let config = sample();
        let land = config.category(5).unwrap();
        assert!(!land.area_query_filter);
        assert_eq!(land.building_type_field, DEFAULT_BUILDING_TYPE_FIELD);
        assert!(land.exclude_building_types.is_empty());
        assert!(config.category(7).unwrap().area_query_filter);
    }

    #[test]
    fn test_empty_schedule_without_run_once_is_rejected() {
        let mut config = sample();
        config.schedule.times.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptySchedule)));

        config.schedule.run_once = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_schedule_time() {
        let mut config = sample();
        config.schedule.times.push("25:99".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScheduleTime(t)) if t == "25:99"
        ));
    }

    #[test]
    fn test_duplicate_category_id() {
        let mut config = sample();
        let copy = config.categories[0].clone();
        config.categories.push(copy);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_region_without_cities() {
        let mut config = sample();
        config.regions[0].cities.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = sample();
        let env: HashMap<&str, &str> = [
            ("REALTY_API_TOKEN", "env-token"),
            ("REALTY_EMAIL_PASSWORD", "secret"),
            ("REALTY_SQLITE_PATH", "/tmp/other.db"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.token, "env-token");
        assert_eq!(config.api.user, "user@example.com");
        assert_eq!(config.email.password, "secret");
        assert_eq!(config.database.sqlite_path, PathBuf::from("/tmp/other.db"));
    }

    #[test]
    fn test_schedule_times_parsed() {
        let times = sample().schedule_times().unwrap();
        assert_eq!(times[1], NaiveTime::from_hms_opt(18, 30, 0).unwrap());
    }
}
