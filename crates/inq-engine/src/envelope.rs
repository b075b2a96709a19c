//! Response envelope returned for every answered query.
//!
//! Serialises as `{"type": "text" | "structured" | "help" | "error", ...}`.
//! Payloads hold only ordered collections and structs so the same answer
//! always serialises to the same bytes.

use inq_core::SecurityEvent;
use serde::Serialize;

use crate::adapter::SiemStatistics;
use crate::aggregate::SeverityTally;
use crate::fallback::FallbackStatistics;
use crate::query_analyzer::Timeframe;

pub const HELP_TEXT: &str = "\
I can help you with:
- Security statistics and metrics
- Threat investigation
- Alert analysis
- Trend reports
- IP and geolocation queries

Try asking:
- \"Show me failed login attempts in last 24 hours\"
- \"List all critical threats\"
- \"Analyze security trends this week\"
- \"Lookup IP 192.168.1.1\"";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Text {
        content: String,
    },
    Structured {
        summary: String,
        data: Payload,
        #[serde(skip_serializing_if = "Option::is_none")]
        recommendation: Option<String>,
    },
    Help {
        content: String,
    },
    Error {
        content: String,
    },
}

impl Envelope {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::Error { content: content.into() }
    }

    pub fn help() -> Self {
        Self::Help { content: HELP_TEXT.to_string() }
    }

    pub fn structured(
        summary: impl Into<String>,
        data: Payload,
        recommendation: Option<String>,
    ) -> Self {
        Self::Structured {
            summary: summary.into(),
            data,
            recommendation,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Structured { .. } => "structured",
            Self::Help { .. } => "help",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    FailedLogins(FailedLoginSummary),
    Threats(ThreatSummary),
    IpActivity(IpActivity),
    Statistics(StatisticsData),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IpCount {
    pub ip: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedLoginSummary {
    pub total: usize,
    #[serde(rename = "uniqueIPs")]
    pub unique_ips: usize,
    #[serde(rename = "topIPs")]
    pub top_ips: Vec<IpCount>,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatSummary {
    pub total: usize,
    #[serde(rename = "bySeverity")]
    pub by_severity: SeverityTally,
    pub timeframe: Timeframe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IpActivity {
    pub ip: String,
    #[serde(rename = "eventCount")]
    pub event_count: u64,
    pub timeframe: Timeframe,
    pub events: Vec<SecurityEvent>,
}

/// Statistics tagged with where they came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum StatisticsData {
    Siem(SiemStatistics),
    Database(FallbackStatistics),
}
