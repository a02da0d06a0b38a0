//! Error types and handling for the gateway

use thiserror::Error;

/// Main error type for the gateway.
///
/// Only `NoFreshData` is allowed to propagate past the aggregation pipeline;
/// per-station upstream failures are skipped, cache failures collapse to a
/// miss, and storage failures collapse to a boolean at the publisher boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Transport or payload failure talking to one sensor station
    #[error("Upstream error: {message}")]
    Upstream { message: String },

    /// Zero stations yielded usable fresh data
    #[error("No fresh temperature data available")]
    NoFreshData,

    /// Cache operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// Object storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl GatewayError {
    /// Create a new upstream error
    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Short diagnostic string safe to expose over the HTTP boundary.
    /// Internal transport detail stays in the logs.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            GatewayError::Upstream { .. } => "Unable to reach the sensor network".to_string(),
            GatewayError::NoFreshData => "No fresh temperature data available".to_string(),
            GatewayError::Cache { .. } => "Cache operation failed".to_string(),
            GatewayError::Storage { .. } => "Storage failed".to_string(),
            GatewayError::Config { message } => {
                format!("Configuration error: {message}")
            }
        }
    }
}

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, GatewayError>;
