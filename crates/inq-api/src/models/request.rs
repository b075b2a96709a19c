use inq_core::{Severity, ThreatStatus};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ChatQueryRequest {
    // missing and blank are both rejected with 400
    #[serde(default)]
    pub query: String,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    #[serde(default = "default_stats_hours")]
    pub hours: u32,
}

fn default_stats_hours() -> u32 {
    24
}

#[derive(Deserialize, Default)]
pub struct SyncRequest {
    pub hours: Option<u32>,
}

impl SyncRequest {
    pub fn hours(&self) -> u32 {
        self.hours.unwrap_or(1)
    }
}

#[derive(Deserialize)]
pub struct ThreatsQuery {
    pub status: Option<String>,
    pub severity: Option<String>,
    #[serde(default = "default_stats_hours")]
    pub hours: u32,
    #[serde(default = "default_threats_limit")]
    pub limit: usize,
}

fn default_threats_limit() -> usize {
    100
}

impl ThreatsQuery {
    // empty values mean no filter
    pub fn status_filter(&self) -> Result<Option<ThreatStatus>, String> {
        match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => ThreatStatus::parse(s)
                .map(Some)
                .ok_or_else(|| format!("Unknown status: {}", s)),
        }
    }

    pub fn severity_filter(&self) -> Result<Option<Severity>, String> {
        match self.severity.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => Severity::parse(s)
                .map(Some)
                .ok_or_else(|| format!("Unknown severity: {}", s)),
        }
    }
}
