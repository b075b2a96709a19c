// Query Analyzer - classifies intent, resolves the lookback window and pulls
// entities out of operator questions

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    FailedLogin, // "show failed logins" → auth failure breakdown by IP
    Threats,     // "list critical threats" → severity tally
    IpLookup,    // "lookup IP 10.0.0.1" → events for one source
    Statistics,  // "how many events" → SIEM / database aggregates
    Help,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::FailedLogin => "failed_login",
            Intent::Threats => "threats",
            Intent::IpLookup => "ip_lookup",
            Intent::Statistics => "statistics",
            Intent::Help => "help",
            Intent::Unknown => "unknown",
        }
    }
}

/// Lookback window for a query. Every variant maps to exactly one hour count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1h")]
    LastHour,
    #[default]
    #[serde(rename = "24h")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
}

impl Timeframe {
    pub fn hours(&self) -> u32 {
        match self {
            Timeframe::LastHour => 1,
            Timeframe::LastDay => 24,
            Timeframe::LastWeek => 168,
            Timeframe::LastMonth => 720,
        }
    }

    /// Short label, also valid Elasticsearch date math (`now-7d`)
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::LastHour => "1h",
            Timeframe::LastDay => "24h",
            Timeframe::LastWeek => "7d",
            Timeframe::LastMonth => "30d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedQuery {
    pub original: String,
    pub intent: Intent,
    pub timeframe: Timeframe,
}

/// Pattern tables are evaluated top to bottom and the first hit wins.
/// Overlapping keywords ("threat from 10.0.0.1") resolve purely by position.
pub struct QueryAnalyzer {
    intent_patterns: Vec<(Intent, Regex)>,
    timeframe_patterns: Vec<(Timeframe, Regex)>,
    ipv4_pattern: Regex,
}

impl QueryAnalyzer {
    pub fn new() -> Self {
        let intent_patterns = vec![
            (Intent::FailedLogin, compile(r"failed login|login attempt|authentication fail|login error")),
            (Intent::Threats, compile(r"threat|attack|malicious|suspicious")),
            (Intent::IpLookup, compile(r"ip|address|source|from")),
            (Intent::Statistics, compile(r"stat|count|how many|total|number of")),
            (Intent::Help, compile(r"help|what can you|how do")),
        ];
        let timeframe_patterns = vec![
            (Timeframe::LastHour, compile(r"last hour|past hour|1 hour")),
            (Timeframe::LastDay, compile(r"24 hours?|today|last day")),
            (Timeframe::LastWeek, compile(r"week|7 days?|last week")),
            (Timeframe::LastMonth, compile(r"month|30 days?|last month")),
        ];
        let ipv4_pattern = compile(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b");

        Self { intent_patterns, timeframe_patterns, ipv4_pattern }
    }

    pub fn analyze(&self, query: &str) -> AnalyzedQuery {
        AnalyzedQuery {
            original: query.to_string(),
            intent: self.classify(query),
            timeframe: self.resolve_timeframe(query),
        }
    }

    pub fn classify(&self, text: &str) -> Intent {
        self.intent_patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Unknown)
    }

    pub fn resolve_timeframe(&self, text: &str) -> Timeframe {
        self.timeframe_patterns
            .iter()
            .find(|(_, pattern)| pattern.is_match(text))
            .map(|(timeframe, _)| *timeframe)
            .unwrap_or_default()
    }

    /// First dotted quad whose octets all fit in 0..=255.
    /// Out-of-range candidates ("999.1.1.1") are skipped, not returned.
    pub fn extract_ipv4(&self, text: &str) -> Option<Ipv4Addr> {
        self.ipv4_pattern.find_iter(text).find_map(|m| parse_octets(m.as_str()))
    }
}

impl Default for QueryAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

// patterns are literals above, a failure here is a programming error
fn compile(pattern: &str) -> Regex {
    Regex::new(&format!("(?i){}", pattern)).unwrap()
}

fn parse_octets(candidate: &str) -> Option<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = candidate.split('.');
    for slot in octets.iter_mut() {
        *slot = parts.next()?.parse().ok()?;
    }
    Some(Ipv4Addr::from(octets))
}
