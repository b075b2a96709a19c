use axum::{Json, http::StatusCode};
use inq_engine::{QueryOutcome, SiemStatus, SyncReport, ThreatList};
use serde::Serialize;

/// JSON error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: u16,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Self>) {
        (status, Json(Self {
            error: message.into(),
            code: status.as_u16(),
        }))
    }

    pub fn bad_request(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unavailable(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> (StatusCode, Json<Self>) {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[derive(Serialize)]
pub struct ChatQueryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub outcome: QueryOutcome,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub report: SyncReport,
}

impl From<SyncReport> for SyncResponse {
    fn from(report: SyncReport) -> Self {
        Self {
            success: true,
            message: format!("Synced {} new threats from SIEM", report.inserted),
            report,
        }
    }
}

#[derive(Serialize)]
pub struct ThreatsResponse {
    pub success: bool,
    #[serde(flatten)]
    pub list: ThreatList,
}

impl From<ThreatList> for ThreatsResponse {
    fn from(list: ThreatList) -> Self {
        Self { success: true, list }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub siem: SiemStatus,
}

impl HealthResponse {
    pub fn ok(siem: SiemStatus) -> Self {
        Self { status: "ok", siem }
    }
}
