//! HTTP client for the sensor station API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::error::{GatewayError, Result};

/// Raw station document as returned by `GET /boxes/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct StationDocument {
    #[serde(default)]
    pub sensors: Vec<SensorEntry>,
}

/// One sensor channel of a station
#[derive(Debug, Clone, Deserialize)]
pub struct SensorEntry {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "lastMeasurement")]
    pub last_measurement: Option<LastMeasurement>,
}

/// Latest measurement of one sensor channel. The API ships the value as a
/// JSON string.
#[derive(Debug, Clone, Deserialize)]
pub struct LastMeasurement {
    pub value: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
}

/// Remote sensor API surface.
///
/// Narrow seam so aggregation and availability logic can run against
/// substitutable fakes in tests.
#[async_trait]
pub trait SensorApi: Send + Sync {
    /// Fetch the full document for one station. Any transport-level problem
    /// (timeout, non-2xx, malformed payload) maps to an upstream error.
    async fn fetch_station(&self, station_id: &str) -> Result<StationDocument>;

    /// Lightweight reachability probe: true iff the station answered with a
    /// successful status.
    async fn probe_station(&self, station_id: &str) -> bool;
}

/// Sensor station API client
pub struct SensorApiClient {
    client: Client,
    base_url: String,
    fetch_timeout: Duration,
    probe_timeout: Duration,
}

impl SensorApiClient {
    /// Create a new client. Retry policy deliberately lives in the
    /// aggregator (skip-and-continue), not here.
    pub fn new(config: &UpstreamConfig) -> Self {
        let client = Client::builder()
            .user_agent(concat!("hivegate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
            probe_timeout: Duration::from_secs(config.probe_timeout_seconds),
        }
    }

    fn station_url(&self, station_id: &str) -> String {
        format!("{}/boxes/{}", self.base_url, station_id)
    }
}

#[async_trait]
impl SensorApi for SensorApiClient {
    async fn fetch_station(&self, station_id: &str) -> Result<StationDocument> {
        let response = self
            .client
            .get(self.station_url(station_id))
            .timeout(self.fetch_timeout)
            .send()
            .await
            .map_err(|e| {
                GatewayError::upstream(format!("Failed to fetch station {station_id}: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::upstream(format!(
                "Station {station_id} returned {}",
                response.status()
            )));
        }

        response.json::<StationDocument>().await.map_err(|e| {
            GatewayError::upstream(format!("Failed to parse station {station_id} response: {e}"))
        })
    }

    async fn probe_station(&self, station_id: &str) -> bool {
        match self
            .client
            .get(self.station_url(station_id))
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(station_id, error = %e, "Availability probe failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UpstreamConfig;

    #[test]
    fn test_station_url_joins_without_double_slash() {
        let mut config = UpstreamConfig::default();
        config.base_url = "https://api.example.org/".to_string();
        let client = SensorApiClient::new(&config);
        assert_eq!(
            client.station_url("abc123"),
            "https://api.example.org/boxes/abc123"
        );
    }

    #[test]
    fn test_station_document_parses_api_shape() {
        let raw = r#"{
            "name": "Rooftop",
            "sensors": [
                {"title": "Temperatur", "lastMeasurement": {"value": "22.5", "createdAt": "2026-02-11T10:00:00Z"}},
                {"title": "rel. Luftfeuchte", "lastMeasurement": null},
                {"title": "Feinstaub"}
            ]
        }"#;
        let document: StationDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(document.sensors.len(), 3);
        assert_eq!(document.sensors[0].title, "Temperatur");
        let measurement = document.sensors[0].last_measurement.as_ref().unwrap();
        assert_eq!(measurement.value.as_deref(), Some("22.5"));
        assert!(document.sensors[1].last_measurement.is_none());
        assert!(document.sensors[2].last_measurement.is_none());
    }

    #[test]
    fn test_station_document_tolerates_missing_sensors_key() {
        let document: StationDocument = serde_json::from_str("{}").unwrap();
        assert!(document.sensors.is_empty());
    }
}
