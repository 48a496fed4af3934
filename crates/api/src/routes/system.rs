//! Health and metrics endpoints.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;

/// State shared by the system endpoints.
#[derive(Clone)]
pub struct SystemState {
    /// Name of the storage backend serving carts and products.
    pub backend: &'static str,
    pub metrics: PrometheusHandle,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backend: &'static str,
}

/// GET /health — returns system health status.
pub async fn health(State(system): State<SystemState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        backend: system.backend,
    })
}

/// GET /metrics — returns Prometheus-formatted metrics.
pub async fn metrics(State(system): State<SystemState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        system.metrics.render(),
    )
}
