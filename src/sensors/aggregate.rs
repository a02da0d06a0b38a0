//! Fetches all configured stations, filters by freshness, and reduces the
//! surviving readings to one classified average

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::client::SensorApi;
use super::freshness::{extract_reading, is_fresh};
use super::{StationReading, TemperatureStatus};
use crate::error::{GatewayError, Result};

/// Aggregated outcome of one full pass over the configured stations.
///
/// `sample_count == 0` never leaves the aggregator: an empty pass is the
/// terminal `NoFreshData` failure instead, so the 0.0 sentinel average is
/// only reachable through the pure [`average`] function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub average_temperature: f64,
    pub status: TemperatureStatus,
    pub sample_count: usize,
}

/// Aggregation pipeline over a fixed station set
pub struct Aggregator {
    api: Arc<dyn SensorApi>,
    station_ids: Vec<String>,
    phenomenon: String,
    max_data_age_seconds: u64,
}

impl Aggregator {
    pub fn new(
        api: Arc<dyn SensorApi>,
        station_ids: Vec<String>,
        phenomenon: String,
        max_data_age_seconds: u64,
    ) -> Self {
        Self {
            api,
            station_ids,
            phenomenon,
            max_data_age_seconds,
        }
    }

    /// One full pass: every configured station is fetched (concurrently,
    /// each bounded by the client's per-call timeout), unreachable stations
    /// are skipped, stale or absent readings are dropped.
    ///
    /// Fails only when nothing fresh survives the pass.
    pub async fn fetch_all(&self) -> Result<Vec<StationReading>> {
        let now = Utc::now();

        let fetches = self
            .station_ids
            .iter()
            .map(|id| async move { (id.as_str(), self.api.fetch_station(id).await) });
        let outcomes = join_all(fetches).await;

        let mut readings = Vec::new();
        for (station_id, outcome) in outcomes {
            match outcome {
                Ok(document) => match extract_reading(&document, &self.phenomenon) {
                    Some(reading)
                        if is_fresh(reading.observed_at, now, self.max_data_age_seconds) =>
                    {
                        readings.push(reading);
                    }
                    Some(reading) => {
                        debug!(
                            station_id,
                            observed_at = %reading.observed_at,
                            "Dropping stale reading"
                        );
                    }
                    None => {
                        debug!(station_id, "Station has no usable measurement");
                    }
                },
                Err(e) => {
                    warn!(station_id, error = %e, "Skipping unreachable station");
                }
            }
        }

        if readings.is_empty() {
            return Err(GatewayError::NoFreshData);
        }

        Ok(readings)
    }

    /// Full pipeline: fetch, reduce, classify.
    pub async fn aggregate(&self) -> Result<AggregateResult> {
        let readings = self.fetch_all().await?;
        let average_temperature = average(&readings);
        Ok(AggregateResult {
            average_temperature,
            status: classify(average_temperature),
            sample_count: readings.len(),
        })
    }
}

/// Arithmetic mean of all readings, rounded to 2 decimal places. Ties round
/// half away from zero. The empty set yields exactly 0.0; callers distinguish
/// "no data" by sample count, never by the sentinel value.
#[must_use]
pub fn average(readings: &[StationReading]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let sum: f64 = readings.iter().map(|r| r.value).sum();
    ((sum / readings.len() as f64) * 100.0).round() / 100.0
}

/// Classify an average into a status band. Boundaries are inclusive on the
/// Good side at both ends.
#[must_use]
pub fn classify(average: f64) -> TemperatureStatus {
    if average < 10.0 {
        TemperatureStatus::TooCold
    } else if average <= 36.0 {
        TemperatureStatus::Good
    } else {
        TemperatureStatus::TooHot
    }
}
