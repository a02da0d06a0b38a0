//! Reachability probes, independent of data freshness

use std::sync::Arc;

use futures::future::join_all;

use super::client::SensorApi;

/// Outcome of one availability pass. Ephemeral, one per readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityTally {
    pub available: usize,
    pub total: usize,
}

impl AvailabilityTally {
    /// Share of configured stations that failed their probe, as a
    /// percentage. Defined as 100% when no stations are configured.
    #[must_use]
    pub fn unavailable_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        ((self.total - self.available) as f64 / self.total as f64) * 100.0
    }
}

/// Probes every configured station for reachability
pub struct AvailabilityChecker {
    api: Arc<dyn SensorApi>,
    station_ids: Vec<String>,
}

impl AvailabilityChecker {
    pub fn new(api: Arc<dyn SensorApi>, station_ids: Vec<String>) -> Self {
        Self { api, station_ids }
    }

    /// Probe all stations concurrently, each bounded by the client's probe
    /// timeout. One station's failure never affects another's count and
    /// never raises.
    pub async fn check(&self) -> AvailabilityTally {
        let probes = self.station_ids.iter().map(|id| self.api.probe_station(id));
        let results = join_all(probes).await;

        AvailabilityTally {
            available: results.into_iter().filter(|ok| *ok).count(),
            total: self.station_ids.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, Result};
    use crate::sensors::client::StationDocument;
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct FakeProbeApi {
        reachable: HashSet<String>,
    }

    impl FakeProbeApi {
        fn new(reachable: &[&str]) -> Self {
            Self {
                reachable: reachable.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl SensorApi for FakeProbeApi {
        async fn fetch_station(&self, station_id: &str) -> Result<StationDocument> {
            Err(GatewayError::upstream(format!(
                "probe-only fake asked for data of {station_id}"
            )))
        }

        async fn probe_station(&self, station_id: &str) -> bool {
            self.reachable.contains(station_id)
        }
    }

    fn checker(reachable: &[&str], configured: &[&str]) -> AvailabilityChecker {
        AvailabilityChecker::new(
            Arc::new(FakeProbeApi::new(reachable)),
            configured.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_check_counts_reachable_stations() {
        let tally = checker(&["a", "c"], &["a", "b", "c"]).check().await;
        assert_eq!(tally.available, 2);
        assert_eq!(tally.total, 3);
    }

    #[tokio::test]
    async fn test_check_all_unreachable() {
        let tally = checker(&[], &["a", "b", "c"]).check().await;
        assert_eq!(tally.available, 0);
        assert_eq!(tally.total, 3);
    }

    #[tokio::test]
    async fn test_check_no_stations_configured() {
        let tally = checker(&[], &[]).check().await;
        assert_eq!(tally.total, 0);
        assert_eq!(tally.unavailable_percent(), 100.0);
    }

    #[test]
    fn test_unavailable_percent() {
        let tally = AvailabilityTally {
            available: 1,
            total: 4,
        };
        assert_eq!(tally.unavailable_percent(), 75.0);

        let full = AvailabilityTally {
            available: 3,
            total: 3,
        };
        assert_eq!(full.unavailable_percent(), 0.0);
    }
}
