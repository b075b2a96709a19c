// Turns API JSON into table rows. Pure, so the terminal code stays thin.

use serde_json::Value;

pub const SEVERITY_ORDER: [&str; 4] = ["Critical", "High", "Medium", "Low"];

/// `[{ip, count}]` or `[{key, count}]` arrays as (label, count) rows
pub fn count_rows(items: &Value) -> Vec<(String, u64)> {
    items
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|item| {
                    let label = item.get("ip").or_else(|| item.get("key"))?.as_str()?;
                    let count = item.get("count")?.as_u64()?;
                    Some((label.to_string(), count))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// `bySeverity` object in fixed Critical..Low order
pub fn severity_rows(by_severity: &Value) -> Vec<(String, u64)> {
    SEVERITY_ORDER
        .iter()
        .map(|s| (s.to_string(), by_severity[*s].as_u64().unwrap_or(0)))
        .collect()
}

/// One row per event sample: time, action, severity, destination
pub fn event_rows(events: &Value) -> Vec<[String; 4]> {
    let field = |e: &Value, key: &str| {
        e.get(key)
            .and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_else(|| "-".to_string())
    };

    events
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|e| {
                    [
                        field(e, "timestamp"),
                        field(e, "action"),
                        field(e, "severity"),
                        field(e, "destinationIp"),
                    ]
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Stored threat records: detected, severity, type, source IP, status
pub fn threat_rows(threats: &Value) -> Vec<[String; 5]> {
    let field = |t: &Value, key: &str| t[key].as_str().unwrap_or("-").to_string();

    threats
        .as_array()
        .map(|arr| {
            arr.iter()
                .map(|t| {
                    [
                        field(t, "detected_at"),
                        field(t, "severity"),
                        field(t, "threat_type"),
                        field(t, "source_ip"),
                        field(t, "status"),
                    ]
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Recommendations that ask the operator to act
pub fn is_alarming(recommendation: &str) -> bool {
    ["consider blocking", "Unusual activity", "require immediate attention"]
        .iter()
        .any(|marker| recommendation.contains(marker))
}
