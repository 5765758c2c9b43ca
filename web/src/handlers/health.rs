//! Liveness, readiness and metrics.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

/// `GET /health`: the process is up. Checks nothing else.
#[allow(clippy::unused_async)]
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// `GET /ready`: the store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.registry.store().ping().await.map_err(|e| {
        AppError::unavailable("Store is not reachable").with_source(anyhow::Error::new(e))
    })?;
    Ok(Json(json!({ "status": "ready" })))
}

/// `GET /metrics`: Prometheus text format. Mounted only with an exporter.
#[allow(clippy::unused_async)]
pub async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(exporter) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            exporter.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
