//! Background publication of the latest aggregate on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::metrics::Metrics;
use crate::service::TemperatureService;
use crate::storage::{AggregateStorage, PersistedRecord};

/// Delay before the first scheduled publication so the process is fully up
/// before touching the stations.
pub const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Publishes aggregates to object storage, on demand and on a timer.
pub struct StoragePublisher {
    service: Arc<TemperatureService>,
    storage: Arc<AggregateStorage>,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl StoragePublisher {
    pub fn new(
        service: Arc<TemperatureService>,
        storage: Arc<AggregateStorage>,
        metrics: Arc<Metrics>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            storage,
            metrics,
            interval,
        }
    }

    /// Compute a fresh aggregate and write it as a new immutable record.
    ///
    /// Never propagates past this boundary: a failed tick reports `false`
    /// and the next interval fires regardless.
    pub async fn publish_once(&self) -> bool {
        let aggregate = match self.service.compute_fresh().await {
            Ok(aggregate) => aggregate,
            Err(e) => {
                warn!(error = %e, "Skipping publication, no aggregate available");
                return false;
            }
        };

        let record = PersistedRecord::capture(&aggregate);
        let stored = self.storage.store_record(&record).await;

        if stored {
            self.metrics.storage_operations.inc();
            self.metrics.storage_connected.set(1);
        } else {
            self.metrics.storage_connected.set(0);
        }

        stored
    }

    /// Spawn the interval loop. The returned sender stops it cooperatively
    /// at the next sleep boundary; the handle joins it at shutdown.
    pub fn spawn(self: Arc<Self>, initial_delay: Duration) -> (oneshot::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + initial_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(
                interval_seconds = self.interval.as_secs(),
                "Storage publisher started"
            );

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Storage publisher stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        if !self.publish_once().await {
                            warn!("Scheduled publication failed, will retry next interval");
                        }
                    }
                }
            }
        });

        (shutdown_tx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AggregateStore;
    use crate::config::StorageConfig;
    use crate::sensors::Aggregator;
    use crate::sensors::client::{SensorApi, StationDocument};
    use async_trait::async_trait;
    use std::time::Duration;

    struct DeadSensorApi;

    #[async_trait]
    impl SensorApi for DeadSensorApi {
        async fn fetch_station(&self, station_id: &str) -> crate::Result<StationDocument> {
            Err(crate::GatewayError::upstream(format!(
                "station {station_id} down"
            )))
        }

        async fn probe_station(&self, _station_id: &str) -> bool {
            false
        }
    }

    struct NullStore;

    #[async_trait]
    impl AggregateStore for NullStore {
        async fn get(&self, _key: &str) -> crate::Result<Option<crate::AggregateResult>> {
            Ok(None)
        }

        async fn put(
            &self,
            _key: &str,
            _value: crate::AggregateResult,
            _ttl: Duration,
        ) -> crate::Result<()> {
            Ok(())
        }

        async fn ttl_remaining(&self, _key: &str) -> crate::Result<Option<i64>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_publish_once_is_false_without_fresh_data() {
        let metrics = Arc::new(Metrics::new());
        let aggregator = Aggregator::new(
            Arc::new(DeadSensorApi),
            vec!["a".to_string()],
            "Temperatur".to_string(),
            3600,
        );
        let service = Arc::new(TemperatureService::new(
            aggregator,
            Arc::new(NullStore),
            metrics.clone(),
            Duration::from_secs(300),
        ));
        // Endpoint is never contacted: the aggregate fails first.
        let storage = Arc::new(AggregateStorage::connect(&StorageConfig::default()).await);
        let publisher = StoragePublisher::new(service, storage, metrics, Duration::from_secs(300));

        assert!(!publisher.publish_once().await);
    }

    #[tokio::test]
    async fn test_spawned_loop_stops_on_shutdown_signal() {
        let metrics = Arc::new(Metrics::new());
        let aggregator = Aggregator::new(
            Arc::new(DeadSensorApi),
            vec!["a".to_string()],
            "Temperatur".to_string(),
            3600,
        );
        let service = Arc::new(TemperatureService::new(
            aggregator,
            Arc::new(NullStore),
            metrics.clone(),
            Duration::from_secs(300),
        ));
        let storage = Arc::new(AggregateStorage::connect(&StorageConfig::default()).await);
        let publisher = Arc::new(StoragePublisher::new(
            service,
            storage,
            metrics,
            Duration::from_secs(300),
        ));

        let (stop, handle) = publisher.spawn(Duration::from_secs(60));
        stop.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("publisher did not stop")
            .unwrap();
    }
}
