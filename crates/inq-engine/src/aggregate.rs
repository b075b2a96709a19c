// Aggregation helpers - grouping and ranking of event sets

use inq_core::{SecurityEvent, Severity};
use serde::Serialize;
use std::collections::HashMap;

use crate::backend::CountBucket;

/// Count occurrences per key and rank them by count, descending.
/// Equal counts keep the order in which the keys were first seen.
pub fn rank_by_count<I, K>(keys: I) -> Vec<CountBucket>
where
    I: IntoIterator<Item = K>,
    K: Into<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<CountBucket> = Vec::new();

    for key in keys {
        let key = key.into();
        match index.get(&key) {
            Some(&i) => buckets[i].count += 1,
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push(CountBucket::new(key, 1));
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    buckets.sort_by(|a, b| b.count.cmp(&a.count));
    buckets
}

/// Group events by source IP. Events without one are grouped under "unknown".
pub fn rank_source_ips(events: &[SecurityEvent]) -> Vec<CountBucket> {
    rank_by_count(
        events
            .iter()
            .map(|e| e.source_ip.clone().unwrap_or_else(|| "unknown".to_string())),
    )
}

/// Fixed four-bucket severity breakdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SeverityTally {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl SeverityTally {
    /// Unlabelled or unrecognised severities count as Medium
    pub fn from_events(events: &[SecurityEvent]) -> Self {
        let mut tally = Self::default();
        for event in events {
            tally.add(Severity::or_default(event.severity.as_deref()));
        }
        tally
    }

    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low
    }
}
