//! Configuration management for the gateway
//!
//! Handles loading configuration from an optional TOML file and
//! `HIVEGATE_`-prefixed environment variables, and provides validation for
//! all configuration settings.

use crate::GatewayError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Sensor station API configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sensor station API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the sensor station API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Station identifiers polled each aggregation pass
    #[serde(default = "default_station_ids")]
    pub station_ids: Vec<String>,
    /// Maximum accepted measurement age in seconds
    #[serde(default = "default_max_data_age")]
    pub max_data_age_seconds: u64,
    /// Sensor channel title to match (case-sensitive)
    #[serde(default = "default_phenomenon")]
    pub phenomenon: String,
    /// Per-station data fetch timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    /// Per-station availability probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache directory location
    #[serde(default = "default_cache_path")]
    pub path: String,
    /// Aggregate TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

/// Object storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3-compatible endpoint URL
    #[serde(default = "default_storage_endpoint")]
    pub endpoint: String,
    /// Access key
    #[serde(default = "default_storage_access_key")]
    pub access_key: String,
    /// Secret key
    #[serde(default = "default_storage_secret_key")]
    pub secret_key: String,
    /// Bucket receiving the immutable aggregate records
    #[serde(default = "default_storage_bucket")]
    pub bucket: String,
    /// Region name passed to the SDK
    #[serde(default = "default_storage_region")]
    pub region: String,
    /// Interval between scheduled publications in seconds
    #[serde(default = "default_publish_interval")]
    pub publish_interval_seconds: u64,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_server_port")]
    pub port: u16,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://api.opensensemap.org".to_string()
}

fn default_station_ids() -> Vec<String> {
    vec![
        "5eba5fbad46fb8001b799786".to_string(),
        "5c21ff8f919bf8001adf2488".to_string(),
        "5ade1acf223bd80019a1011c".to_string(),
    ]
}

fn default_max_data_age() -> u64 {
    3600
}

fn default_phenomenon() -> String {
    "Temperatur".to_string()
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_cache_path() -> String {
    "hivegate_cache".to_string()
}

fn default_cache_ttl() -> u64 {
    300
}

fn default_storage_endpoint() -> String {
    "http://localhost:9000".to_string()
}

fn default_storage_access_key() -> String {
    "minioadmin".to_string()
}

fn default_storage_secret_key() -> String {
    "minioadmin".to_string()
}

fn default_storage_bucket() -> String {
    "hivegate".to_string()
}

fn default_storage_region() -> String {
    "us-east-1".to_string()
}

fn default_publish_interval() -> u64 {
    300
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            station_ids: default_station_ids(),
            max_data_age_seconds: default_max_data_age(),
            phenomenon: default_phenomenon(),
            fetch_timeout_seconds: default_fetch_timeout(),
            probe_timeout_seconds: default_probe_timeout(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: default_storage_endpoint(),
            access_key: default_storage_access_key(),
            secret_key: default_storage_secret_key(),
            bucket: default_storage_bucket(),
            region: default_storage_region(),
            publish_interval_seconds: default_publish_interval(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("hivegate.toml"));

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides: HIVEGATE_UPSTREAM__BASE_URL, etc.
        // Station lists are comma-separated.
        builder = builder.add_source(
            Environment::with_prefix("HIVEGATE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("upstream.station_ids"),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: GatewayConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to fields an override blanked out
    pub fn apply_defaults(&mut self) {
        if self.upstream.base_url.is_empty() {
            self.upstream.base_url = default_base_url();
        }
        if self.upstream.phenomenon.is_empty() {
            self.upstream.phenomenon = default_phenomenon();
        }
        if self.upstream.max_data_age_seconds == 0 {
            self.upstream.max_data_age_seconds = default_max_data_age();
        }
        if self.upstream.fetch_timeout_seconds == 0 {
            self.upstream.fetch_timeout_seconds = default_fetch_timeout();
        }
        if self.upstream.probe_timeout_seconds == 0 {
            self.upstream.probe_timeout_seconds = default_probe_timeout();
        }
        if self.cache.path.is_empty() {
            self.cache.path = default_cache_path();
        }
        if self.cache.ttl_seconds == 0 {
            self.cache.ttl_seconds = default_cache_ttl();
        }
        if self.storage.publish_interval_seconds == 0 {
            self.storage.publish_interval_seconds = default_publish_interval();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.upstream.fetch_timeout_seconds > 300 {
            return Err(
                GatewayError::config("Station fetch timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.upstream.probe_timeout_seconds > 60 {
            return Err(
                GatewayError::config("Station probe timeout cannot exceed 60 seconds").into(),
            );
        }

        if self.upstream.max_data_age_seconds > 604_800 {
            return Err(
                GatewayError::config("Max data age cannot exceed 604800 seconds (1 week)").into(),
            );
        }

        if self.cache.ttl_seconds > 86_400 {
            return Err(
                GatewayError::config("Cache TTL cannot exceed 86400 seconds (1 day)").into(),
            );
        }

        if self.storage.publish_interval_seconds < 10 {
            return Err(
                GatewayError::config("Publish interval cannot be below 10 seconds").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(GatewayError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        if !self.upstream.base_url.starts_with("http://")
            && !self.upstream.base_url.starts_with("https://")
        {
            return Err(GatewayError::config(
                "Sensor API base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if !self.storage.endpoint.starts_with("http://")
            && !self.storage.endpoint.starts_with("https://")
        {
            return Err(GatewayError::config(
                "Storage endpoint must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.storage.bucket.is_empty() {
            return Err(GatewayError::config("Storage bucket cannot be empty").into());
        }

        Ok(())
    }
}
