//! Sensor station domain: upstream client, freshness policy, aggregation,
//! and availability probing.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod availability;
pub mod client;
pub mod freshness;

pub use aggregate::{AggregateResult, Aggregator, average, classify};
pub use availability::{AvailabilityChecker, AvailabilityTally};
pub use client::{SensorApi, SensorApiClient, StationDocument};

/// One usable measurement from a single station.
///
/// Ephemeral: constructed during an aggregation pass and dropped with it.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    /// Measured value in °C
    pub value: f64,
    /// When the station recorded the measurement
    pub observed_at: DateTime<Utc>,
}

/// Band classification for an aggregate temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureStatus {
    #[serde(rename = "Too Cold")]
    TooCold,
    Good,
    #[serde(rename = "Too Hot")]
    TooHot,
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TemperatureStatus::TooCold => "Too Cold",
            TemperatureStatus::Good => "Good",
            TemperatureStatus::TooHot => "Too Hot",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_matches_serialized_form() {
        assert_eq!(TemperatureStatus::TooCold.to_string(), "Too Cold");
        assert_eq!(TemperatureStatus::Good.to_string(), "Good");
        assert_eq!(TemperatureStatus::TooHot.to_string(), "Too Hot");

        let json = serde_json::to_string(&TemperatureStatus::TooHot).unwrap();
        assert_eq!(json, "\"Too Hot\"");
    }
}
