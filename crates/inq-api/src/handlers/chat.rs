use axum::{Json, extract::State};
use inq_engine::EngineError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::models::{ApiError, ApiResult, ChatQueryRequest, ChatQueryResponse};
use crate::state::AppState;

pub async fn chat_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatQueryRequest>,
) -> ApiResult<ChatQueryResponse> {
    let start = Instant::now();

    let outcome = state.dispatcher.handle(&req.query).await.map_err(|e| match e {
        EngineError::InvalidInput => ApiError::bad_request("Query is required"),
        other => {
            error!(error = %other, "Chat query error");
            ApiError::internal("Error processing query")
        }
    })?;

    info!(
        intent = outcome.intent.as_str(),
        timeframe = %outcome.timeframe,
        response = outcome.response.kind(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Chat query answered"
    );

    Ok(Json(ChatQueryResponse {
        success: true,
        outcome,
    }))
}
