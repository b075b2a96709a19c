// SIEM -> threat store sync
// Copies SIEM threats into the threats table so the fallback has data to aggregate

use inq_core::ThreatRecord;
use serde::Serialize;
use tracing::{debug, info};

use crate::adapter::SearchAdapter;
use crate::store::{StoreError, ThreatStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub processed: usize,
    pub inserted: usize,
}

/// Insert every SIEM threat from the last `hours` whose event id isn't stored yet.
/// A SIEM failure is absorbed by the adapter and shows up as nothing processed.
pub async fn sync_threats(
    adapter: &SearchAdapter,
    store: &dyn ThreatStore,
    hours: u32,
) -> Result<SyncReport, StoreError> {
    let events = adapter.threats(hours, None).await;
    let mut report = SyncReport {
        processed: events.len(),
        inserted: 0,
    };

    for event in &events {
        if store.has_siem_event(&event.id).await? {
            debug!(siem_event_id = %event.id, "Threat already recorded");
            continue;
        }
        store.record_threat(&ThreatRecord::from_event(event)).await?;
        report.inserted += 1;
    }

    info!(
        hours,
        processed = report.processed,
        inserted = report.inserted,
        "Synced threats from SIEM"
    );
    Ok(report)
}
