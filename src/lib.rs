//! `HiveGate` - Environmental monitoring gateway for beehive sensor stations
//!
//! This library polls a fixed set of openSenseMap-style sensor stations,
//! aggregates their latest temperature readings, caches the aggregate,
//! periodically persists it to object storage, and serves the result over
//! HTTP alongside health, readiness, and metrics endpoints.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod publisher;
pub mod readiness;
pub mod sensors;
pub mod service;
pub mod storage;
pub mod web;

// Re-export core types for public API
pub use cache::{AggregateCache, AggregateStore};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use metrics::Metrics;
pub use publisher::StoragePublisher;
pub use sensors::{
    AggregateResult, Aggregator, AvailabilityChecker, AvailabilityTally, SensorApi,
    SensorApiClient, StationReading, TemperatureStatus,
};
pub use service::TemperatureService;
pub use storage::{AggregateStorage, PersistedRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
