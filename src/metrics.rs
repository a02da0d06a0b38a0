//! Prometheus metrics registry and exposition

use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};
use tracing::warn;

/// Content type of the text exposition format.
pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// All gateway metrics, registered on an explicit registry so tests never
/// collide on global state.
pub struct Metrics {
    registry: Registry,
    pub temperature_requests: IntCounter,
    pub version_requests: IntCounter,
    pub cache_hits: IntCounter,
    pub cache_misses: IntCounter,
    pub storage_operations: IntCounter,
    pub temperature_celsius: Gauge,
    pub stations_available: IntGauge,
    pub stations_total: IntGauge,
    pub cache_connected: IntGauge,
    pub storage_connected: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let temperature_requests = IntCounter::new(
            "hivegate_temperature_requests_total",
            "Total number of temperature requests",
        )
        .expect("temperature requests counter");
        registry
            .register(Box::new(temperature_requests.clone()))
            .expect("register temperature requests");

        let version_requests = IntCounter::new(
            "hivegate_version_requests_total",
            "Total number of version requests",
        )
        .expect("version requests counter");
        registry
            .register(Box::new(version_requests.clone()))
            .expect("register version requests");

        let cache_hits = IntCounter::new(
            "hivegate_temperature_cache_hits_total",
            "Total number of cache hits for temperature data",
        )
        .expect("cache hits counter");
        registry
            .register(Box::new(cache_hits.clone()))
            .expect("register cache hits");

        let cache_misses = IntCounter::new(
            "hivegate_temperature_cache_misses_total",
            "Total number of cache misses for temperature data",
        )
        .expect("cache misses counter");
        registry
            .register(Box::new(cache_misses.clone()))
            .expect("register cache misses");

        let storage_operations = IntCounter::new(
            "hivegate_storage_operations_total",
            "Total number of successful storage operations",
        )
        .expect("storage operations counter");
        registry
            .register(Box::new(storage_operations.clone()))
            .expect("register storage operations");

        let temperature_celsius = Gauge::new(
            "hivegate_temperature_celsius",
            "Last aggregated temperature in Celsius",
        )
        .expect("temperature gauge");
        registry
            .register(Box::new(temperature_celsius.clone()))
            .expect("register temperature gauge");

        let stations_available = IntGauge::new(
            "hivegate_stations_available",
            "Stations that answered the last availability probe",
        )
        .expect("stations available gauge");
        registry
            .register(Box::new(stations_available.clone()))
            .expect("register stations available");

        let stations_total = IntGauge::new(
            "hivegate_stations_total",
            "Configured stations at the last availability probe",
        )
        .expect("stations total gauge");
        registry
            .register(Box::new(stations_total.clone()))
            .expect("register stations total");

        let cache_connected = IntGauge::new(
            "hivegate_cache_connected",
            "Cache store status (1 for connected, 0 for disconnected)",
        )
        .expect("cache connected gauge");
        registry
            .register(Box::new(cache_connected.clone()))
            .expect("register cache connected");

        let storage_connected = IntGauge::new(
            "hivegate_storage_connected",
            "Object storage status (1 for connected, 0 for disconnected)",
        )
        .expect("storage connected gauge");
        registry
            .register(Box::new(storage_connected.clone()))
            .expect("register storage connected");

        Self {
            registry,
            temperature_requests,
            version_requests,
            cache_hits,
            cache_misses,
            storage_operations,
            temperature_celsius,
            stations_available,
            stations_total,
            cache_connected,
            storage_connected,
        }
    }

    /// Render the full registry in the Prometheus text format.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
        }
        buffer
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
