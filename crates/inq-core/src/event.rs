//! Security events as read from the SIEM index.
//!
//! Index documents come in two shapes: ECS-style nested objects
//! (`{"source": {"ip": ..}}`) and flattened dotted keys (`{"source.ip": ..}`).
//! Both normalise to the same [`SecurityEvent`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single event from the search backend. The engine only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEvent {
    pub id: String,

    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default)]
    pub source_ip: Option<String>,

    #[serde(default)]
    pub destination_ip: Option<String>,

    #[serde(default)]
    pub destination_port: Option<u16>,

    #[serde(default)]
    pub action: Option<String>, // event.action, e.g. authentication_failure

    #[serde(default)]
    pub severity: Option<String>, // raw event.severity label

    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub document: Value, // original _source
}

impl SecurityEvent {
    /// Build an event from an index hit's `_id` and `_source`
    pub fn from_document(id: impl Into<String>, source: &Value) -> Self {
        let timestamp = lookup(source, "@timestamp")
            .or_else(|| lookup(source, "timestamp"))
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let source_ip = lookup_string(source, "source.ip").or_else(|| lookup_string(source, "sourceIp"));

        let destination_port = lookup(source, "destination.port").and_then(|v| match v {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });

        Self {
            id: id.into(),
            timestamp,
            source_ip,
            destination_ip: lookup_string(source, "destination.ip"),
            destination_port,
            action: lookup_string(source, "event.action"),
            severity: lookup_string(source, "event.severity"),
            country: lookup_string(source, "source.geo.country_name"),
            document: source.clone(),
        }
    }
}

// dotted key first, then walk nested objects
fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if let Some(v) = doc.get(path) {
        return Some(v);
    }
    let mut current = doc;
    for part in path.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

fn lookup_string(doc: &Value, path: &str) -> Option<String> {
    match lookup(doc, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
