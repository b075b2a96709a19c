// Search adapter
// Wraps a SearchBackend and absorbs its failures: a failed query is logged
// and comes back as an empty result (or None for statistics).

use inq_core::{SecurityEvent, Severity};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::backend::{CountBucket, SearchBackend, SearchPage, TermsField};
use crate::query_analyzer::Timeframe;

const STATS_BUCKETS: usize = 10;

/// SIEM-side statistics for a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiemStatistics {
    #[serde(rename = "totalEvents")]
    pub total_events: u64,
    #[serde(rename = "threatsBySeverity")]
    pub threats_by_severity: Vec<CountBucket>,
    #[serde(rename = "topSourceIPs")]
    pub top_source_ips: Vec<CountBucket>,
    pub timeframe: String,
}

#[derive(Clone)]
pub struct SearchAdapter {
    backend: Arc<dyn SearchBackend>,
}

impl SearchAdapter {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    pub async fn failed_logins(&self, hours: u32) -> Vec<SecurityEvent> {
        match self.backend.failed_logins(hours).await {
            Ok(events) => {
                info!(hours, count = events.len(), "Failed logins fetched");
                events
            }
            Err(e) => {
                error!(backend = self.backend.name(), error = %e, "Error fetching failed logins");
                Vec::new()
            }
        }
    }

    pub async fn threats(&self, hours: u32, severity: Option<Severity>) -> Vec<SecurityEvent> {
        match self.backend.threats(hours, severity).await {
            Ok(events) => {
                info!(hours, severity = ?severity, count = events.len(), "Threats fetched");
                events
            }
            Err(e) => {
                error!(backend = self.backend.name(), error = %e, "Error fetching threats");
                Vec::new()
            }
        }
    }

    pub async fn search_by_query(&self, filter: &str, timeframe: Timeframe) -> SearchPage {
        match self.backend.search(filter, timeframe).await {
            Ok(page) => {
                info!(filter, timeframe = %timeframe, total = page.total, "Search complete");
                page
            }
            Err(e) => {
                error!(backend = self.backend.name(), error = %e, "Error searching logs");
                SearchPage::default()
            }
        }
    }

    /// Total, severity buckets and source-IP buckets run concurrently.
    /// If any of the three fails the whole result is None.
    pub async fn statistics(&self, hours: u32) -> Option<SiemStatistics> {
        let joined = tokio::try_join!(
            self.backend.count_events(hours),
            self.backend.top_terms(TermsField::Severity, hours, STATS_BUCKETS),
            self.backend.top_terms(TermsField::SourceIp, hours, STATS_BUCKETS),
        );

        match joined {
            Ok((total_events, threats_by_severity, top_source_ips)) => Some(SiemStatistics {
                total_events,
                threats_by_severity,
                top_source_ips,
                timeframe: format!("{}h", hours),
            }),
            Err(e) => {
                error!(backend = self.backend.name(), error = %e, "Error getting statistics");
                None
            }
        }
    }

    /// Cluster health probe. A red cluster counts as unavailable.
    pub async fn probe(&self) -> bool {
        match self.backend.health().await {
            Ok(health) if health.is_usable() => {
                info!(cluster = %health.cluster_name, status = %health.status, "Search backend connected");
                true
            }
            Ok(health) => {
                warn!(cluster = %health.cluster_name, status = %health.status, "Search backend unhealthy");
                false
            }
            Err(e) => {
                error!(backend = self.backend.name(), error = %e, "Search backend connection failed");
                false
            }
        }
    }
}
