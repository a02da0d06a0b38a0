//! Read-through cache coordination in front of the aggregator

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::AggregateStore;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::sensors::{AggregateResult, Aggregator};

/// Cache key holding the latest aggregate.
const AGGREGATE_KEY: &str = "temperature:aggregate";

/// Serves aggregates, preferring the cache over recomputation.
///
/// The cache is an optimization, not a correctness dependency: read and
/// write failures are logged and treated as a miss, never surfaced to the
/// caller. The cache's own TTL is the sole staleness control for hits.
pub struct TemperatureService {
    aggregator: Aggregator,
    cache: Arc<dyn AggregateStore>,
    metrics: Arc<Metrics>,
    cache_ttl: Duration,
}

impl TemperatureService {
    pub fn new(
        aggregator: Aggregator,
        cache: Arc<dyn AggregateStore>,
        metrics: Arc<Metrics>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            aggregator,
            cache,
            metrics,
            cache_ttl,
        }
    }

    /// Key under which the aggregate is cached; readiness probes the same
    /// key.
    #[must_use]
    pub fn aggregate_key() -> &'static str {
        AGGREGATE_KEY
    }

    /// Serve from cache when possible; recompute and write through
    /// otherwise. Concurrent callers during a miss may each recompute.
    pub async fn get_or_compute(&self) -> Result<AggregateResult> {
        match self.cache.get(AGGREGATE_KEY).await {
            Ok(Some(cached)) => {
                self.metrics.cache_hits.inc();
                debug!("Serving aggregate from cache");
                return Ok(cached);
            }
            Ok(None) => {
                self.metrics.cache_misses.inc();
            }
            Err(e) => {
                self.metrics.cache_misses.inc();
                warn!(error = %e, "Cache read failed, recomputing");
            }
        }

        let result = self.compute_fresh().await?;

        if let Err(e) = self
            .cache
            .put(AGGREGATE_KEY, result.clone(), self.cache_ttl)
            .await
        {
            warn!(error = %e, "Cache write failed, serving uncached result");
        }

        Ok(result)
    }

    /// Always recompute, bypassing the cache. The persistence path uses
    /// this so stored records reflect the stations, not the cache.
    pub async fn compute_fresh(&self) -> Result<AggregateResult> {
        let result = self.aggregator.aggregate().await?;
        self.metrics
            .temperature_celsius
            .set(result.average_temperature);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::sensors::client::{LastMeasurement, SensorApi, SensorEntry, StationDocument};
    use crate::sensors::TemperatureStatus;
    use async_trait::async_trait;
    use chrono::{SecondsFormat, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSensorApi {
        values: Vec<f64>,
        fetch_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SensorApi for FixedSensorApi {
        async fn fetch_station(&self, station_id: &str) -> crate::Result<StationDocument> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            let index: usize = station_id.parse().unwrap();
            let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            Ok(StationDocument {
                sensors: vec![SensorEntry {
                    title: "Temperatur".to_string(),
                    last_measurement: Some(LastMeasurement {
                        value: Some(self.values[index].to_string()),
                        created_at: Some(created_at),
                    }),
                }],
            })
        }

        async fn probe_station(&self, _station_id: &str) -> bool {
            true
        }
    }

    /// In-memory store; optionally fails every operation.
    #[derive(Default)]
    struct MemoryStore {
        entry: Mutex<Option<AggregateResult>>,
        failing: bool,
    }

    #[async_trait]
    impl AggregateStore for MemoryStore {
        async fn get(&self, _key: &str) -> crate::Result<Option<AggregateResult>> {
            if self.failing {
                return Err(GatewayError::cache("store offline"));
            }
            Ok(self.entry.lock().unwrap().clone())
        }

        async fn put(
            &self,
            _key: &str,
            value: AggregateResult,
            _ttl: Duration,
        ) -> crate::Result<()> {
            if self.failing {
                return Err(GatewayError::cache("store offline"));
            }
            *self.entry.lock().unwrap() = Some(value);
            Ok(())
        }

        async fn ttl_remaining(&self, _key: &str) -> crate::Result<Option<i64>> {
            if self.failing {
                return Err(GatewayError::cache("store offline"));
            }
            Ok(self.entry.lock().unwrap().as_ref().map(|_| 300))
        }
    }

    fn service_with(
        values: Vec<f64>,
        store: Arc<dyn AggregateStore>,
    ) -> (TemperatureService, Arc<AtomicUsize>) {
        let fetch_calls = Arc::new(AtomicUsize::new(0));
        let station_ids: Vec<String> = (0..values.len()).map(|i| i.to_string()).collect();
        let api = FixedSensorApi {
            values,
            fetch_calls: fetch_calls.clone(),
        };
        let aggregator = Aggregator::new(
            Arc::new(api),
            station_ids,
            "Temperatur".to_string(),
            3600,
        );
        let service = TemperatureService::new(
            aggregator,
            store,
            Arc::new(Metrics::new()),
            Duration::from_secs(300),
        );
        (service, fetch_calls)
    }

    #[tokio::test]
    async fn test_miss_computes_and_writes_through() {
        let store = Arc::new(MemoryStore::default());
        let (service, _) = service_with(vec![20.0, 22.0], store.clone());

        let result = service.get_or_compute().await.unwrap();
        assert_eq!(result.average_temperature, 21.0);
        assert_eq!(result.status, TemperatureStatus::Good);
        assert_eq!(result.sample_count, 2);

        // Write-through happened.
        assert!(store.entry.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_skips_recomputation() {
        let store = Arc::new(MemoryStore::default());
        let (service, fetch_calls) = service_with(vec![20.0, 22.0], store.clone());

        service.get_or_compute().await.unwrap();
        let after_first = fetch_calls.load(Ordering::SeqCst);
        let second = service.get_or_compute().await.unwrap();

        assert_eq!(fetch_calls.load(Ordering::SeqCst), after_first);
        assert_eq!(second.average_temperature, 21.0);
    }

    #[tokio::test]
    async fn test_cache_failure_falls_through_to_aggregator() {
        let store = Arc::new(MemoryStore {
            entry: Mutex::new(None),
            failing: true,
        });
        let (service, _) = service_with(vec![20.0, 22.0], store);

        // Both the read and the write fail; the caller still gets a result.
        let result = service.get_or_compute().await.unwrap();
        assert_eq!(result.average_temperature, 21.0);
    }
}
