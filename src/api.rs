//! HTTP surface: version, temperature, storage trigger, liveness,
//! readiness, and metrics

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::cache::AggregateStore;
use crate::error::GatewayError;
use crate::metrics::{METRICS_CONTENT_TYPE, Metrics};
use crate::readiness::{self, CacheState};
use crate::sensors::{AvailabilityChecker, TemperatureStatus};
use crate::service::TemperatureService;
use crate::storage::{AggregateStorage, PersistedRecord};

/// Shared handler state. Every collaborator is injected at construction;
/// handlers never reach for globals.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TemperatureService>,
    pub availability: Arc<AvailabilityChecker>,
    pub cache: Arc<dyn AggregateStore>,
    pub storage: Arc<AggregateStorage>,
    pub metrics: Arc<Metrics>,
}

/// Error surfaced over HTTP. Bodies carry a short `detail` string only.
enum ApiError {
    /// Dependent service cannot currently satisfy the request
    Unavailable(String),
    /// Anything unexpected
    Internal(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NoFreshData | GatewayError::Storage { .. } => {
                ApiError::Unavailable(err.detail())
            }
            other => ApiError::Internal(other.detail()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
}

#[derive(Serialize)]
struct TemperatureResponse {
    average_temperature: f64,
    unit: &'static str,
    samples: usize,
    status: TemperatureStatus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(version))
        .route("/version", get(version))
        .route("/temperature", get(temperature))
        .route("/store", get(store))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_exposition))
        .with_state(state)
}

async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    state.metrics.version_requests.inc();
    Json(VersionResponse {
        version: crate::VERSION,
    })
}

async fn temperature(
    State(state): State<AppState>,
) -> Result<Json<TemperatureResponse>, ApiError> {
    state.metrics.temperature_requests.inc();
    let aggregate = state.service.get_or_compute().await?;

    Ok(Json(TemperatureResponse {
        average_temperature: aggregate.average_temperature,
        unit: "°C",
        samples: aggregate.sample_count,
        status: aggregate.status,
    }))
}

/// Manual publication trigger. A storage failure is a 503; anything that
/// prevents computing the aggregate in the first place is unexpected here
/// and reported as a 500.
async fn store(State(state): State<AppState>) -> Result<Response, ApiError> {
    let aggregate = state
        .service
        .compute_fresh()
        .await
        .map_err(|e| ApiError::Internal(e.detail()))?;

    let record = PersistedRecord::capture(&aggregate);
    if !state.storage.store_record(&record).await {
        state.metrics.storage_connected.set(0);
        return Err(ApiError::Unavailable("Storage failed".to_string()));
    }

    state.metrics.storage_operations.inc();
    state.metrics.storage_connected.set(1);

    Ok(Json(json!({
        "message": "Data stored successfully",
        "data": aggregate,
    }))
    .into_response())
}

/// Liveness only: answers whenever the process can handle requests.
async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn readyz(State(state): State<AppState>) -> Response {
    let tally = state.availability.check().await;
    state.metrics.stations_available.set(tally.available as i64);
    state.metrics.stations_total.set(tally.total as i64);

    let cache_state = match state
        .cache
        .ttl_remaining(TemperatureService::aggregate_key())
        .await
    {
        Ok(Some(ttl)) if ttl > 0 => CacheState::Fresh { ttl_seconds: ttl },
        Ok(Some(_)) => CacheState::Expired,
        Ok(None) => CacheState::Missing,
        Err(e) => {
            warn!(error = %e, "Cache probe failed");
            CacheState::Unavailable
        }
    };

    let cache_status = match cache_state {
        CacheState::Unavailable => "disconnected",
        _ => "connected",
    };
    state
        .metrics
        .cache_connected
        .set(i64::from(cache_state != CacheState::Unavailable));

    // Diagnostic only; the object store does not gate readiness.
    let storage_ok = state.storage.probe().await;
    state.metrics.storage_connected.set(i64::from(storage_ok));
    let storage_status = if storage_ok {
        "connected"
    } else {
        "disconnected"
    };

    let result = readiness::evaluate(&tally, cache_state);
    if result.ready {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "cache": cache_status,
                "storage": storage_status,
                "checks": { "stations": "ok", "cache": "ok" },
            })),
        )
            .into_response()
    } else {
        warn!(reasons = ?result.reasons, "Readiness check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not ready",
                "cache": cache_status,
                "storage": storage_status,
                "reasons": result.reasons,
            })),
        )
            .into_response()
    }
}

async fn metrics_exposition(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, METRICS_CONTENT_TYPE)],
        state.metrics.render(),
    )
        .into_response()
}
