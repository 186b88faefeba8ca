//! HTTP request handlers and shared application state.

use crate::api::admission::Admission;
use crate::api::errors::ApiError;
use axum::extract::State;
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Instant;

/// Body returned by the demo route.
pub const ROOT_BODY: &str = "Requisição bem-sucedida";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Rate limiter wired into the admission middleware.
    pub admission: Admission,
    pub prometheus_handle: PrometheusHandle,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(admission: Admission, prometheus_handle: PrometheusHandle) -> Self {
        Self {
            admission,
            prometheus_handle,
            start_time: Instant::now(),
        }
    }
}

/// `GET /`: plain-text success body for admitted requests.
pub async fn root() -> &'static str {
    ROOT_BODY
}

/// `GET /health`: liveness plus the registry's size and policy. Not rate limited.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.admission.registry();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "tracked_clients": registry.len(),
        "limit": registry.config().limit,
        "burst": registry.config().burst,
    }))
}

/// `GET /metrics`: Prometheus text exposition. Not rate limited.
pub async fn metrics_endpoint(State(state): State<AppState>) -> String {
    state.prometheus_handle.render()
}

/// Fallback for unmatched paths. Runs behind admission, so 404s consume tokens too.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
