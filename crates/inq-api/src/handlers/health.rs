use axum::{Json, extract::State};
use std::sync::Arc;
use tracing::info;

use crate::models::HealthResponse;
use crate::state::AppState;

// Reports the last known SIEM status, never probes
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.dispatcher.status()))
}

pub async fn siem_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    info!("SIEM health check requested");
    let status = state.dispatcher.check_health().await;
    Json(HealthResponse::ok(status))
}
