use axum::{
    Json,
    extract::{Query, State},
};
use inq_engine::{EngineError, ThreatStatsReport, sync_threats};
use std::sync::Arc;
use tracing::{error, info};

use crate::models::{
    ApiError, ApiResult, StatsQuery, SyncRequest, SyncResponse, ThreatsQuery, ThreatsResponse,
};
use crate::state::AppState;

pub async fn list_threats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ThreatsQuery>,
) -> ApiResult<ThreatsResponse> {
    if params.hours == 0 {
        return Err(ApiError::bad_request("hours must be positive"));
    }
    let status = params.status_filter().map_err(ApiError::bad_request)?;
    let severity = params.severity_filter().map_err(ApiError::bad_request)?;
    info!(hours = params.hours, limit = params.limit, ?status, ?severity, "List threats request");

    let list = state
        .dispatcher
        .list_threats(params.hours, status, severity, params.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "Get threats error");
            match e {
                EngineError::NoFallback => ApiError::unavailable("Threat store not configured"),
                _ => ApiError::internal("Error fetching threats"),
            }
        })?;

    Ok(Json(ThreatsResponse::from(list)))
}

pub async fn threat_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQuery>,
) -> ApiResult<ThreatStatsReport> {
    if params.hours == 0 {
        return Err(ApiError::bad_request("hours must be positive"));
    }
    info!(hours = params.hours, "Threat stats request");

    let report = state.dispatcher.threat_stats(params.hours).await.map_err(|e| {
        error!(error = %e, "Get stats error");
        match e {
            EngineError::NoFallback => ApiError::unavailable("Threat store not configured"),
            _ => ApiError::internal("Error fetching statistics"),
        }
    })?;

    Ok(Json(report))
}

pub async fn sync_from_siem(
    State(state): State<Arc<AppState>>,
    body: Option<Json<SyncRequest>>,
) -> ApiResult<SyncResponse> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let hours = req.hours();
    if hours == 0 {
        return Err(ApiError::bad_request("hours must be positive"));
    }

    let store = state
        .store()
        .ok_or_else(|| ApiError::unavailable("Threat store not configured"))?;

    info!(hours, "Threat sync request");
    let report = sync_threats(state.dispatcher.adapter(), store.as_ref(), hours)
        .await
        .map_err(|e| {
            error!(error = %e, "Sync threats error");
            ApiError::internal("Error syncing threats from SIEM")
        })?;

    Ok(Json(SyncResponse::from(report)))
}
