// Dispatcher
// Orchestrates: Query Analysis -> per-intent handler -> SIEM (or fallback store) -> Envelope

use inq_core::{Severity, ThreatStatus};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::adapter::{SearchAdapter, SiemStatistics};
use crate::aggregate::{SeverityTally, rank_source_ips};
use crate::config::Thresholds;
use crate::envelope::{
    Envelope, FailedLoginSummary, IpActivity, IpCount, Payload, StatisticsData, ThreatSummary,
};
use crate::fallback::{FallbackAggregator, FallbackStatistics, ThreatList};
use crate::query_analyzer::{Intent, QueryAnalyzer, Timeframe};
use crate::store::StoreError;

const TOP_FAILED_LOGIN_IPS: usize = 5;
const IP_EVENT_SAMPLE: usize = 10;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Query is required")]
    InvalidInput,

    #[error("Threat store error: {0}")]
    Store(#[from] StoreError),

    #[error("No fallback threat store configured")]
    NoFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SiemStatus {
    Available,
    Degraded,
}

impl SiemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiemStatus::Available => "available",
            SiemStatus::Degraded => "degraded",
        }
    }
}

/// One answered query, as handed to the HTTP layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: String,
    pub intent: Intent,
    pub timeframe: Timeframe,
    pub response: Envelope,
}

/// Database aggregates plus SIEM statistics when the SIEM can provide them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatStatsReport {
    pub database: FallbackStatistics,
    pub siem: Option<SiemStatistics>,
    pub timeframe: String,
}

pub struct Dispatcher {
    analyzer: QueryAnalyzer,
    adapter: SearchAdapter,
    fallback: Option<FallbackAggregator>,
    thresholds: Thresholds,
    siem_available: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        adapter: SearchAdapter,
        fallback: Option<FallbackAggregator>,
        thresholds: Thresholds,
        siem_available: bool,
    ) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(),
            adapter,
            fallback,
            thresholds,
            siem_available: AtomicBool::new(siem_available),
        }
    }

    /// Build and run the startup probe once
    pub async fn connect(
        adapter: SearchAdapter,
        fallback: Option<FallbackAggregator>,
        thresholds: Thresholds,
    ) -> Self {
        let available = adapter.probe().await;
        if !available {
            warn!("SIEM unavailable at startup, running in degraded mode");
        }
        Self::new(adapter, fallback, thresholds, available)
    }

    /// Re-probe the SIEM. This is the only place the flag changes after startup.
    pub async fn check_health(&self) -> SiemStatus {
        let available = self.adapter.probe().await;
        self.siem_available.store(available, Ordering::SeqCst);
        let status = self.status();
        info!(siem = status.as_str(), "SIEM health re-checked");
        status
    }

    pub fn status(&self) -> SiemStatus {
        if self.siem_available.load(Ordering::SeqCst) {
            SiemStatus::Available
        } else {
            SiemStatus::Degraded
        }
    }

    pub fn adapter(&self) -> &SearchAdapter {
        &self.adapter
    }

    pub fn fallback(&self) -> Option<&FallbackAggregator> {
        self.fallback.as_ref()
    }

    fn siem_available(&self) -> bool {
        self.siem_available.load(Ordering::SeqCst)
    }

    /// Answer a free-text question
    pub async fn handle(&self, query: &str) -> Result<QueryOutcome, EngineError> {
        if query.trim().is_empty() {
            return Err(EngineError::InvalidInput);
        }

        let analyzed = self.analyzer.analyze(query);
        let intent = analyzed.intent;
        let timeframe = analyzed.timeframe;

        info!(
            intent = intent.as_str(),
            timeframe = %timeframe,
            siem = self.status().as_str(),
            "Processing query"
        );

        let result = match intent {
            Intent::FailedLogin => self.failed_logins(timeframe).await,
            Intent::Threats => self.threats(timeframe).await,
            Intent::IpLookup => self.ip_lookup(query, timeframe).await,
            Intent::Statistics => self.statistics(timeframe).await,
            Intent::Help => Ok(Envelope::help()),
            Intent::Unknown => Ok(unknown_response(query)),
        };

        let response = result.unwrap_or_else(|e| {
            error!(intent = intent.as_str(), error = %e, "Query handler failed");
            Envelope::error(failure_message(intent))
        });

        Ok(QueryOutcome {
            query: query.to_string(),
            intent,
            timeframe,
            response,
        })
    }

    /// Threat-table aggregates for `hours`, with SIEM statistics attached when available
    pub async fn threat_stats(&self, hours: u32) -> Result<ThreatStatsReport, EngineError> {
        let fallback = self.fallback.as_ref().ok_or(EngineError::NoFallback)?;
        let database = fallback.statistics(hours).await?;

        let siem = if self.siem_available() {
            self.adapter.statistics(hours).await
        } else {
            None
        };

        Ok(ThreatStatsReport {
            database,
            siem,
            timeframe: format!("{}h", hours),
        })
    }

    /// Recorded threats from the store, newest first. The SIEM is not consulted.
    pub async fn list_threats(
        &self,
        hours: u32,
        status: Option<ThreatStatus>,
        severity: Option<Severity>,
        limit: usize,
    ) -> Result<ThreatList, EngineError> {
        let fallback = self.fallback.as_ref().ok_or(EngineError::NoFallback)?;
        Ok(fallback.recent_threats(hours, status, severity, limit).await?)
    }

    // HANDLERS //

    async fn failed_logins(&self, timeframe: Timeframe) -> Result<Envelope, EngineError> {
        let events = if self.siem_available() {
            self.adapter.failed_logins(timeframe.hours()).await
        } else {
            Vec::new()
        };

        if events.is_empty() {
            return Ok(Envelope::text(format!(
                "No failed login attempts found in the last {}.",
                timeframe
            )));
        }

        let ranked = rank_source_ips(&events);
        let unique_ips = ranked.len();
        let top_ips: Vec<IpCount> = ranked
            .into_iter()
            .take(TOP_FAILED_LOGIN_IPS)
            .map(|b| IpCount { ip: b.key, count: b.count })
            .collect();

        let recommendation = match top_ips.first() {
            Some(top) if top.count > self.thresholds.block_attempts => format!(
                "IP {} has {} attempts - consider blocking",
                top.ip, top.count
            ),
            _ => "No suspicious patterns detected".to_string(),
        };

        Ok(Envelope::structured(
            format!(
                "Found {} failed login attempts from {} unique IPs in the last {}",
                events.len(),
                unique_ips,
                timeframe
            ),
            Payload::FailedLogins(FailedLoginSummary {
                total: events.len(),
                unique_ips,
                top_ips,
                timeframe,
            }),
            Some(recommendation),
        ))
    }

    async fn threats(&self, timeframe: Timeframe) -> Result<Envelope, EngineError> {
        let events = if self.siem_available() {
            self.adapter.threats(timeframe.hours(), None).await
        } else {
            Vec::new()
        };

        if events.is_empty() {
            return Ok(Envelope::text(format!(
                "No threats detected in the last {}.",
                timeframe
            )));
        }

        let by_severity = SeverityTally::from_events(&events);
        let recommendation = if by_severity.critical > 0 {
            format!(
                "{} critical threats require immediate attention!",
                by_severity.critical
            )
        } else {
            "No critical threats detected".to_string()
        };

        Ok(Envelope::structured(
            format!("Found {} threats in the last {}", events.len(), timeframe),
            Payload::Threats(ThreatSummary {
                total: events.len(),
                by_severity,
                timeframe,
            }),
            Some(recommendation),
        ))
    }

    async fn ip_lookup(&self, query: &str, timeframe: Timeframe) -> Result<Envelope, EngineError> {
        let Some(ip) = self.analyzer.extract_ipv4(query) else {
            return Ok(Envelope::text(
                "Please specify an IP address to lookup (e.g., \"lookup IP 192.168.1.1\")",
            ));
        };
        let ip = ip.to_string();

        let page = if self.siem_available() {
            let filter = format!("source.ip:\"{}\"", ip);
            self.adapter.search_by_query(&filter, timeframe).await
        } else {
            Default::default()
        };

        let event_count = page.total;
        let recommendation = if event_count > self.thresholds.unusual_activity_events {
            format!("Unusual activity detected from {}", ip)
        } else {
            "Normal activity levels".to_string()
        };

        Ok(Envelope::structured(
            format!(
                "Found {} events from IP {} in the last {}",
                event_count, ip, timeframe
            ),
            Payload::IpActivity(IpActivity {
                ip,
                event_count,
                timeframe,
                events: page.events.into_iter().take(IP_EVENT_SAMPLE).collect(),
            }),
            Some(recommendation),
        ))
    }

    async fn statistics(&self, timeframe: Timeframe) -> Result<Envelope, EngineError> {
        let hours = timeframe.hours();

        let siem = if self.siem_available() {
            self.adapter.statistics(hours).await
        } else {
            None
        };

        let data = match siem {
            Some(stats) => StatisticsData::Siem(stats),
            None => {
                warn!(hours, "SIEM statistics unavailable, using threat store");
                let fallback = self.fallback.as_ref().ok_or(EngineError::NoFallback)?;
                StatisticsData::Database(fallback.statistics(hours).await?)
            }
        };

        Ok(Envelope::structured(
            format!("Security statistics for the last {}", timeframe),
            Payload::Statistics(data),
            None,
        ))
    }
}

fn unknown_response(query: &str) -> Envelope {
    Envelope::text(format!(
        "I understand you're asking about: \"{}\". Try rephrasing your question or type \"help\" to see what I can do.",
        query
    ))
}

fn failure_message(intent: Intent) -> &'static str {
    match intent {
        Intent::FailedLogin => "Unable to fetch failed login data from SIEM",
        Intent::Threats => "Unable to fetch threat data from SIEM",
        Intent::IpLookup => "Unable to lookup IP address",
        Intent::Statistics => "Unable to fetch statistics",
        _ => "Error processing query",
    }
}
