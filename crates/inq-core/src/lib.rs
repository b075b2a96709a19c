//! Core types for the Inquisitor security assistant
//! shared data structures used across the engine, API, worker and CLI.
pub mod event;

pub use event::SecurityEvent;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// SEVERITY //

/// Threat severity levels (ordered from highest to lowest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];

    /// Parse severity from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "crit" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" | "med" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    /// Severity used when an event carries no recognisable label
    pub fn or_default(label: Option<&str>) -> Self {
        label.and_then(Self::parse).unwrap_or(Self::Medium)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }
}

// THREAT STATUS //

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ThreatStatus {
    #[default]
    Active,
    Investigating,
    Blocked,
    Resolved,
}

impl ThreatStatus {
    pub const ALL: [ThreatStatus; 4] = [Self::Active, Self::Investigating, Self::Blocked, Self::Resolved];

    /// Parse status from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|status| status.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Investigating => "Investigating",
            Self::Blocked => "Blocked",
            Self::Resolved => "Resolved",
        }
    }
}

// THREAT RECORD (what the relational store keeps)

/// A threat row in the `threats` table.
/// Rows are created by the SIEM sync job and read back by the fallback aggregator
/// and the threat listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatRecord {
    pub id: Uuid,

    pub threat_type: String, // event.action from the SIEM, "Unknown" when absent

    pub severity: Severity,

    pub source_ip: String,

    #[serde(default)]
    pub target_ip: Option<String>,

    #[serde(default)]
    pub target_port: Option<u16>,

    pub status: ThreatStatus,

    #[serde(default)]
    pub country: Option<String>,

    pub detected_at: DateTime<Utc>,

    #[serde(default)]
    pub siem_event_id: Option<String>, // id of the index document this row came from

    #[serde(default)]
    pub details: serde_json::Value, // full SIEM document
}

impl ThreatRecord {
    // create a threat record from a SIEM event
    // fills the same defaults the dashboard expects for partial events
    pub fn from_event(event: &SecurityEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            threat_type: event.action.clone().unwrap_or_else(|| "Unknown".to_string()),
            severity: Severity::or_default(event.severity.as_deref()),
            source_ip: event.source_ip.clone().unwrap_or_else(|| "unknown".to_string()),
            target_ip: event.destination_ip.clone(),
            target_port: event.destination_port,
            status: ThreatStatus::Active,
            country: event.country.clone(),
            detected_at: event.timestamp.unwrap_or_else(Utc::now),
            siem_event_id: Some(event.id.clone()),
            details: event.document.clone(),
        }
    }
}
