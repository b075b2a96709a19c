// Fallback aggregator
// Statistics from the threats table when the SIEM can't answer

use chrono::{Duration, Utc};
use inq_core::{Severity, ThreatRecord, ThreatStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::backend::CountBucket;
use crate::store::{StoreError, ThreatQuery, ThreatStore};

const TOP_IPS: usize = 10;
const MAX_LISTED_THREATS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackStatistics {
    #[serde(rename = "severityCounts")]
    pub severity_counts: Vec<CountBucket>,
    #[serde(rename = "statusCounts")]
    pub status_counts: Vec<CountBucket>,
    #[serde(rename = "topIPs")]
    pub top_ips: Vec<CountBucket>,
    pub timeframe: String,
}

/// Recorded threats, newest first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatList {
    pub count: usize,
    pub threats: Vec<ThreatRecord>,
}

#[derive(Clone)]
pub struct FallbackAggregator {
    store: Arc<dyn ThreatStore>,
}

impl FallbackAggregator {
    pub fn new(store: Arc<dyn ThreatStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ThreatStore> {
        &self.store
    }

    /// Aggregates over threats detected in the last `hours`
    pub async fn statistics(&self, hours: u32) -> Result<FallbackStatistics, StoreError> {
        let since = Utc::now() - Duration::hours(i64::from(hours));

        let severity_counts = self.store.severity_counts(since).await?;
        let status_counts = self.store.status_counts(since).await?;
        let top_ips = self.store.top_source_ips(since, TOP_IPS).await?;

        info!(
            hours,
            severities = severity_counts.len(),
            ips = top_ips.len(),
            "Fallback statistics from threat store"
        );

        Ok(FallbackStatistics {
            severity_counts,
            status_counts,
            top_ips,
            timeframe: format!("{}h", hours),
        })
    }

    /// Threats detected in the last `hours`, optionally narrowed by status and severity
    pub async fn recent_threats(
        &self,
        hours: u32,
        status: Option<ThreatStatus>,
        severity: Option<Severity>,
        limit: usize,
    ) -> Result<ThreatList, StoreError> {
        let query = ThreatQuery {
            since: Utc::now() - Duration::hours(i64::from(hours)),
            status,
            severity,
            limit: limit.min(MAX_LISTED_THREATS),
        };
        let threats = self.store.list_threats(&query).await?;

        info!(hours, limit = query.limit, found = threats.len(), "Listed threats from store");

        Ok(ThreatList {
            count: threats.len(),
            threats,
        })
    }
}
