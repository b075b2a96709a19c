// Search backend trait
// The raw primitives the engine needs from the SIEM event index

use async_trait::async_trait;
use inq_core::{SecurityEvent, Severity};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query_analyzer::Timeframe;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Search backend returned error: {0}")]
    ApiError(String),

    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Fields the engine aggregates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsField {
    Severity,
    SourceIp,
}

/// One (key, count) bucket of a grouping, in ranked order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    pub key: String,
    pub count: u64,
}

impl CountBucket {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self { key: key.into(), count }
    }
}

/// Result of a free-form search: a capped page of events plus the real hit total
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub total: u64,
    pub events: Vec<SecurityEvent>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: String, // green / yellow / red
}

impl ClusterHealth {
    pub fn is_usable(&self) -> bool {
        self.status != "red"
    }
}

/// Every call is a single attempt; implementations must not retry.
/// Hour windows are `[now - hours, now]`, callers only pass positive counts.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Authentication failures, newest first, at most 1000
    async fn failed_logins(&self, hours: u32) -> Result<Vec<SecurityEvent>, BackendError>;

    /// Security events, newest first, at most 500
    async fn threats(
        &self,
        hours: u32,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityEvent>, BackendError>;

    /// Query-string search, at most 100 events returned
    async fn search(&self, filter: &str, timeframe: Timeframe) -> Result<SearchPage, BackendError>;

    /// Total events in the window
    async fn count_events(&self, hours: u32) -> Result<u64, BackendError>;

    /// Top `size` buckets for `field`
    async fn top_terms(
        &self,
        field: TermsField,
        hours: u32,
        size: usize,
    ) -> Result<Vec<CountBucket>, BackendError>;

    async fn health(&self) -> Result<ClusterHealth, BackendError>;

    /// Name for logs
    fn name(&self) -> &str;
}
