use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hivegate::api::AppState;
use hivegate::cache::{AggregateCache, AggregateStore};
use hivegate::config::GatewayConfig;
use hivegate::metrics::Metrics;
use hivegate::publisher::{self, StoragePublisher};
use hivegate::sensors::{Aggregator, AvailabilityChecker, SensorApiClient};
use hivegate::service::TemperatureService;
use hivegate::storage::AggregateStorage;
use hivegate::web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("hivegate={}", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        version = hivegate::VERSION,
        stations = config.upstream.station_ids.len(),
        "Starting gateway"
    );

    let metrics = Arc::new(Metrics::new());

    let cache: Arc<dyn AggregateStore> = Arc::new(AggregateCache::open(&config.cache.path)?);
    metrics.cache_connected.set(1);

    let storage = Arc::new(AggregateStorage::connect(&config.storage).await);
    let storage_ok = storage.ensure_bucket().await;
    metrics.storage_connected.set(i64::from(storage_ok));
    if !storage_ok {
        tracing::warn!("Object storage unavailable at startup, publications will fail until it returns");
    }

    let api = Arc::new(SensorApiClient::new(&config.upstream));
    let aggregator = Aggregator::new(
        api.clone(),
        config.upstream.station_ids.clone(),
        config.upstream.phenomenon.clone(),
        config.upstream.max_data_age_seconds,
    );
    let availability = Arc::new(AvailabilityChecker::new(
        api,
        config.upstream.station_ids.clone(),
    ));

    let service = Arc::new(TemperatureService::new(
        aggregator,
        cache.clone(),
        metrics.clone(),
        Duration::from_secs(config.cache.ttl_seconds),
    ));

    let storage_publisher = Arc::new(StoragePublisher::new(
        service.clone(),
        storage.clone(),
        metrics.clone(),
        Duration::from_secs(config.storage.publish_interval_seconds),
    ));
    let (publisher_stop, publisher_handle) = storage_publisher.spawn(publisher::INITIAL_DELAY);

    let state = AppState {
        service,
        availability,
        cache,
        storage,
        metrics,
    };

    web::run(state, &config.server.host, config.server.port).await?;

    tracing::info!("Server stopped accepting connections, cleaning up");
    let _ = publisher_stop.send(());
    let _ = tokio::time::timeout(Duration::from_secs(5), publisher_handle).await;
    tracing::info!("Graceful shutdown complete");

    Ok(())
}
