use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono::Duration;
use inq_core::{SecurityEvent, Severity, ThreatRecord, ThreatStatus};
use inq_engine::{
    BackendError, ClusterHealth, CountBucket, Dispatcher, EngineError, Envelope,
    FallbackAggregator, Intent, SearchAdapter, SearchBackend, SearchPage, SiemStatus, StoreError,
    TermsField, ThreatQuery, ThreatStore, Thresholds, Timeframe, sync_threats,
};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// MOCKS //

#[derive(Default)]
struct MockBackend {
    failed_logins: Vec<SecurityEvent>,
    threats: Vec<SecurityEvent>,
    page: SearchPage,
    total_events: u64,
    severity_buckets: Vec<CountBucket>,
    ip_buckets: Vec<CountBucket>,
    fail_terms: bool,
    fail_search: bool,
    cluster_status: Option<&'static str>,
    healthy: AtomicBool,
    query_calls: AtomicUsize,
    last_filter: Mutex<Option<String>>,
}

impl MockBackend {
    fn healthy() -> Self {
        let backend = Self::default();
        backend.healthy.store(true, Ordering::SeqCst);
        backend
    }

    fn calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn search_result(&self) -> Result<(), BackendError> {
        if self.fail_search {
            return Err(BackendError::ApiError("500 Internal Server Error: search_phase_execution_exception".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn failed_logins(&self, _hours: u32) -> Result<Vec<SecurityEvent>, BackendError> {
        self.hit();
        self.search_result()?;
        Ok(self.failed_logins.clone())
    }

    async fn threats(
        &self,
        _hours: u32,
        _severity: Option<Severity>,
    ) -> Result<Vec<SecurityEvent>, BackendError> {
        self.hit();
        self.search_result()?;
        Ok(self.threats.clone())
    }

    async fn search(&self, filter: &str, _timeframe: Timeframe) -> Result<SearchPage, BackendError> {
        self.hit();
        *self.last_filter.lock().unwrap() = Some(filter.to_string());
        self.search_result()?;
        Ok(self.page.clone())
    }

    async fn count_events(&self, _hours: u32) -> Result<u64, BackendError> {
        self.hit();
        Ok(self.total_events)
    }

    async fn top_terms(
        &self,
        field: TermsField,
        _hours: u32,
        _size: usize,
    ) -> Result<Vec<CountBucket>, BackendError> {
        self.hit();
        if self.fail_terms {
            return Err(BackendError::ApiError("503 Service Unavailable: shard failure".to_string()));
        }
        Ok(match field {
            TermsField::Severity => self.severity_buckets.clone(),
            TermsField::SourceIp => self.ip_buckets.clone(),
        })
    }

    async fn health(&self) -> Result<ClusterHealth, BackendError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(ClusterHealth {
                cluster_name: "soc".to_string(),
                status: self.cluster_status.unwrap_or("green").to_string(),
            })
        } else {
            Err(BackendError::ApiError("connection refused".to_string()))
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct MockStore {
    severity: Vec<CountBucket>,
    status: Vec<CountBucket>,
    ips: Vec<CountBucket>,
    records: Mutex<Vec<ThreatRecord>>,
}

#[async_trait]
impl ThreatStore for MockStore {
    async fn severity_counts(&self, _since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError> {
        Ok(self.severity.clone())
    }

    async fn status_counts(&self, _since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError> {
        Ok(self.status.clone())
    }

    async fn top_source_ips(
        &self,
        _since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountBucket>, StoreError> {
        Ok(self.ips.iter().take(limit).cloned().collect())
    }

    async fn list_threats(&self, query: &ThreatQuery) -> Result<Vec<ThreatRecord>, StoreError> {
        let mut found: Vec<ThreatRecord> = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.detected_at >= query.since)
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .filter(|r| query.severity.is_none_or(|s| r.severity == s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        found.truncate(query.limit);
        Ok(found)
    }

    async fn has_siem_event(&self, siem_event_id: &str) -> Result<bool, StoreError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .any(|r| r.siem_event_id.as_deref() == Some(siem_event_id)))
    }

    async fn record_threat(&self, record: &ThreatRecord) -> Result<(), StoreError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// HELPERS //

fn event(id: &str, ip: &str, severity: Option<&str>) -> SecurityEvent {
    let mut doc = json!({ "source.ip": ip, "event.action": "authentication_failure" });
    if let Some(sev) = severity {
        doc["event.severity"] = json!(sev);
    }
    SecurityEvent::from_document(id, &doc)
}

fn seeded_store() -> Arc<MockStore> {
    Arc::new(MockStore {
        severity: vec![CountBucket::new("High", 4), CountBucket::new("Low", 1)],
        status: vec![CountBucket::new("Active", 5)],
        ips: vec![CountBucket::new("203.0.113.45", 3), CountBucket::new("198.51.100.23", 2)],
        ..Default::default()
    })
}

fn dispatcher(backend: Arc<MockBackend>, store: Option<Arc<MockStore>>, available: bool) -> Dispatcher {
    let adapter = SearchAdapter::new(backend);
    let fallback = store.map(|s| FallbackAggregator::new(s as Arc<dyn ThreatStore>));
    Dispatcher::new(adapter, fallback, Thresholds::default(), available)
}

fn to_json(envelope: &Envelope) -> Value {
    serde_json::to_value(envelope).unwrap()
}

// TESTS //

#[tokio::test]
async fn test_failed_logins_recommend_blocking() {
    let mut events = Vec::new();
    for i in 0..12 {
        events.push(event(&format!("a{i}"), "10.0.0.1", None));
    }
    events.push(event("b1", "10.0.0.2", None));
    events.push(event("b2", "10.0.0.2", None));
    events.push(event("c1", "10.0.0.3", None));

    let backend = Arc::new(MockBackend {
        failed_logins: events,
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend, None, true);

    let outcome = dispatcher.handle("show failed logins in the last 7 days").await.unwrap();
    assert_eq!(outcome.intent, Intent::FailedLogin);
    assert_eq!(outcome.timeframe, Timeframe::LastWeek);

    let value = to_json(&outcome.response);
    assert_eq!(value["type"], "structured");
    assert_eq!(value["data"]["total"], 15);
    assert_eq!(value["data"]["uniqueIPs"], 3);
    assert_eq!(value["data"]["topIPs"][0], json!({ "ip": "10.0.0.1", "count": 12 }));
    assert_eq!(
        value["summary"],
        "Found 15 failed login attempts from 3 unique IPs in the last 7d"
    );
    assert_eq!(
        value["recommendation"],
        "IP 10.0.0.1 has 12 attempts - consider blocking"
    );
}

#[tokio::test]
async fn test_failed_logins_at_threshold_not_flagged() {
    let events: Vec<SecurityEvent> = (0..10).map(|i| event(&format!("e{i}"), "10.0.0.9", None)).collect();
    let backend = Arc::new(MockBackend {
        failed_logins: events,
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend, None, true);

    let outcome = dispatcher.handle("login attempts last hour").await.unwrap();
    let value = to_json(&outcome.response);
    assert_eq!(value["recommendation"], "No suspicious patterns detected");
}

#[tokio::test]
async fn test_threats_without_critical() {
    let backend = Arc::new(MockBackend {
        threats: vec![event("t1", "1.1.1.1", Some("High")), event("t2", "2.2.2.2", Some("High"))],
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend, None, true);

    let outcome = dispatcher.handle("list critical threats today").await.unwrap();
    assert_eq!(outcome.intent, Intent::Threats);
    assert_eq!(outcome.timeframe, Timeframe::LastDay);

    let value = to_json(&outcome.response);
    assert_eq!(value["data"]["bySeverity"]["Critical"], 0);
    assert_eq!(value["data"]["bySeverity"]["High"], 2);
    assert_eq!(value["recommendation"], "No critical threats detected");
}

#[tokio::test]
async fn test_no_threats_is_text() {
    let backend = Arc::new(MockBackend::healthy());
    let dispatcher = dispatcher(backend, None, true);

    let outcome = dispatcher.handle("any attacks this month?").await.unwrap();
    assert_eq!(
        outcome.response,
        Envelope::text("No threats detected in the last 30d.")
    );
}

#[tokio::test]
async fn test_ip_lookup_uses_hit_total() {
    let events: Vec<SecurityEvent> = (0..100).map(|i| event(&format!("e{i}"), "192.168.1.1", None)).collect();
    let backend = Arc::new(MockBackend {
        page: SearchPage { total: 250, events },
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend.clone(), None, true);

    let outcome = dispatcher.handle("lookup IP 192.168.1.1 now").await.unwrap();
    assert_eq!(outcome.intent, Intent::IpLookup);
    assert_eq!(
        backend.last_filter.lock().unwrap().as_deref(),
        Some("source.ip:\"192.168.1.1\"")
    );

    let value = to_json(&outcome.response);
    assert_eq!(value["data"]["eventCount"], 250);
    assert_eq!(value["data"]["events"].as_array().unwrap().len(), 10);
    assert_eq!(value["recommendation"], "Unusual activity detected from 192.168.1.1");
}

#[tokio::test]
async fn test_ip_lookup_without_address() {
    let backend = Arc::new(MockBackend::healthy());
    let dispatcher = dispatcher(backend.clone(), None, true);

    let outcome = dispatcher.handle("what address is that").await.unwrap();
    assert_eq!(outcome.intent, Intent::IpLookup);
    assert_eq!(
        outcome.response,
        Envelope::text("Please specify an IP address to lookup (e.g., \"lookup IP 192.168.1.1\")")
    );
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_empty_query_rejected_without_backend_calls() {
    let backend = Arc::new(MockBackend::healthy());
    let dispatcher = dispatcher(backend.clone(), Some(seeded_store()), true);

    assert!(matches!(dispatcher.handle("").await, Err(EngineError::InvalidInput)));
    assert!(matches!(dispatcher.handle("   ").await, Err(EngineError::InvalidInput)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_probe_failure_falls_back_for_statistics() {
    let backend = Arc::new(MockBackend::default());
    let adapter = SearchAdapter::new(backend.clone());
    let fallback = FallbackAggregator::new(seeded_store());
    let dispatcher = Dispatcher::connect(adapter, Some(fallback), Thresholds::default()).await;

    assert_eq!(dispatcher.status(), SiemStatus::Degraded);

    let outcome = dispatcher.handle("show me stats").await.unwrap();
    assert_eq!(outcome.intent, Intent::Statistics);

    let value = to_json(&outcome.response);
    assert_eq!(value["type"], "structured");
    assert_eq!(value["summary"], "Security statistics for the last 24h");
    assert_eq!(value["data"]["source"], "database");
    assert_eq!(value["data"]["severityCounts"][0], json!({ "key": "High", "count": 4 }));
    assert!(value.get("recommendation").is_none());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_degraded_intents_issue_no_queries() {
    let backend = Arc::new(MockBackend {
        failed_logins: vec![event("x", "10.0.0.1", None)],
        ..Default::default()
    });
    let dispatcher = dispatcher(backend.clone(), Some(seeded_store()), false);

    let outcome = dispatcher.handle("failed login attempts today").await.unwrap();
    assert_eq!(
        outcome.response,
        Envelope::text("No failed login attempts found in the last 24h.")
    );

    let outcome = dispatcher.handle("lookup ip 10.0.0.1").await.unwrap();
    let value = to_json(&outcome.response);
    assert_eq!(value["data"]["eventCount"], 0);
    assert_eq!(value["recommendation"], "Normal activity levels");

    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_statistics_from_siem() {
    let backend = Arc::new(MockBackend {
        total_events: 1234,
        severity_buckets: vec![CountBucket::new("High", 30)],
        ip_buckets: vec![CountBucket::new("10.0.0.1", 12)],
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend, Some(seeded_store()), true);

    let outcome = dispatcher.handle("how many events last week").await.unwrap();
    let value = to_json(&outcome.response);
    assert_eq!(value["data"]["source"], "siem");
    assert_eq!(value["data"]["totalEvents"], 1234);
    assert_eq!(value["data"]["timeframe"], "168h");
    assert_eq!(value["data"]["topSourceIPs"][0], json!({ "key": "10.0.0.1", "count": 12 }));
}

#[tokio::test]
async fn test_statistics_join_failure_falls_back() {
    let backend = Arc::new(MockBackend {
        total_events: 99,
        fail_terms: true,
        ..MockBackend::healthy()
    });
    let adapter = SearchAdapter::new(backend.clone());
    assert!(adapter.statistics(24).await.is_none());

    let dispatcher = dispatcher(backend, Some(seeded_store()), true);
    let outcome = dispatcher.handle("total count today").await.unwrap();
    let value = to_json(&outcome.response);
    assert_eq!(value["type"], "structured");
    assert_eq!(value["data"]["source"], "database");
}

#[tokio::test]
async fn test_statistics_without_store_is_error_envelope() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(backend, None, false);

    let outcome = dispatcher.handle("stats please").await.unwrap();
    assert_eq!(outcome.response, Envelope::error("Unable to fetch statistics"));
}

#[tokio::test]
async fn test_identical_queries_serialize_identically() {
    let backend = Arc::new(MockBackend {
        threats: vec![
            event("t1", "1.1.1.1", Some("Critical")),
            event("t2", "2.2.2.2", Some("Low")),
            event("t3", "1.1.1.1", None),
        ],
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend, Some(seeded_store()), true);

    for query in ["suspicious activity this week", "help", "what is the weather", "stats"] {
        let first = serde_json::to_vec(&dispatcher.handle(query).await.unwrap()).unwrap();
        let second = serde_json::to_vec(&dispatcher.handle(query).await.unwrap()).unwrap();
        assert_eq!(first, second, "query {query:?}");
    }
}

#[tokio::test]
async fn test_check_health_updates_status() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(backend.clone(), None, false);
    assert_eq!(dispatcher.status(), SiemStatus::Degraded);

    backend.healthy.store(true, Ordering::SeqCst);
    // no re-evaluation until an explicit check
    assert_eq!(dispatcher.status(), SiemStatus::Degraded);

    assert_eq!(dispatcher.check_health().await, SiemStatus::Available);
    assert_eq!(dispatcher.status(), SiemStatus::Available);
}

#[tokio::test]
async fn test_threat_stats_report() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(backend, Some(seeded_store()), false);

    let report = dispatcher.threat_stats(48).await.unwrap();
    assert!(report.siem.is_none());
    assert_eq!(report.timeframe, "48h");
    assert_eq!(report.database.top_ips[0], CountBucket::new("203.0.113.45", 3));

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["siem"], Value::Null);
}

#[tokio::test]
async fn test_threat_stats_requires_store() {
    let backend = Arc::new(MockBackend::healthy());
    let dispatcher = dispatcher(backend, None, true);
    assert!(matches!(dispatcher.threat_stats(24).await, Err(EngineError::NoFallback)));
}

#[tokio::test]
async fn test_sync_skips_recorded_events() {
    let backend = Arc::new(MockBackend {
        threats: vec![
            event("t1", "1.1.1.1", Some("High")),
            event("t2", "2.2.2.2", None),
            event("t3", "3.3.3.3", Some("Critical")),
        ],
        ..MockBackend::healthy()
    });
    let store = Arc::new(MockStore::default());
    store
        .record_threat(&ThreatRecord::from_event(&event("t1", "1.1.1.1", Some("High"))))
        .await
        .unwrap();

    let adapter = SearchAdapter::new(backend);
    let report = sync_threats(&adapter, store.as_ref(), 1).await.unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.inserted, 2);

    let records = store.records.lock().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[1].severity, Severity::Medium);
    assert_eq!(records[2].severity, Severity::Critical);
    assert_eq!(records[2].threat_type, "authentication_failure");

    // second run inserts nothing
    drop(records);
    let again = sync_threats(&adapter, store.as_ref(), 1).await.unwrap();
    assert_eq!(again.inserted, 0);
}

#[tokio::test]
async fn test_search_failures_become_empty_answers() {
    let backend = Arc::new(MockBackend {
        failed_logins: vec![event("x", "10.0.0.1", None)],
        threats: vec![event("t", "10.0.0.1", Some("Critical"))],
        fail_search: true,
        ..MockBackend::healthy()
    });
    let dispatcher = dispatcher(backend.clone(), None, true);

    let outcome = dispatcher.handle("failed login today").await.unwrap();
    assert_eq!(outcome.intent, Intent::FailedLogin);
    assert_eq!(
        outcome.response,
        Envelope::text("No failed login attempts found in the last 24h.")
    );

    let outcome = dispatcher.handle("show threats today").await.unwrap();
    assert_eq!(outcome.intent, Intent::Threats);
    assert_eq!(
        outcome.response,
        Envelope::text("No threats detected in the last 24h.")
    );

    let outcome = dispatcher.handle("lookup ip 10.0.0.1").await.unwrap();
    let value = to_json(&outcome.response);
    assert_eq!(value["type"], "structured");
    assert_eq!(value["data"]["eventCount"], 0);
    assert_eq!(value["recommendation"], "Normal activity levels");

    // the failures were real backend calls, not skipped ones
    assert_eq!(backend.calls(), 3);
    assert_eq!(dispatcher.status(), SiemStatus::Available);
}

#[tokio::test]
async fn test_red_cluster_is_degraded() {
    let red = ClusterHealth {
        cluster_name: "soc".to_string(),
        status: "red".to_string(),
    };
    assert!(!red.is_usable());

    let backend = Arc::new(MockBackend {
        cluster_status: Some("red"),
        ..MockBackend::healthy()
    });
    let adapter = SearchAdapter::new(backend.clone());
    let dispatcher = Dispatcher::connect(adapter, Some(FallbackAggregator::new(seeded_store())), Thresholds::default()).await;
    assert_eq!(dispatcher.status(), SiemStatus::Degraded);
    assert_eq!(dispatcher.check_health().await, SiemStatus::Degraded);

    let outcome = dispatcher.handle("stats").await.unwrap();
    assert_eq!(to_json(&outcome.response)["data"]["source"], "database");
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn test_yellow_cluster_is_available() {
    let backend = Arc::new(MockBackend {
        cluster_status: Some("yellow"),
        ..MockBackend::healthy()
    });
    let dispatcher = Dispatcher::connect(SearchAdapter::new(backend), None, Thresholds::default()).await;
    assert_eq!(dispatcher.status(), SiemStatus::Available);
}

fn recorded(id: &str, ip: &str, severity: Severity, status: ThreatStatus, hours_ago: i64) -> ThreatRecord {
    let mut record = ThreatRecord::from_event(&event(id, ip, Some(severity.as_str())));
    record.status = status;
    record.detected_at = Utc::now() - Duration::hours(hours_ago);
    record
}

#[tokio::test]
async fn test_list_threats_filters_and_orders() {
    let store = Arc::new(MockStore::default());
    for record in [
        recorded("old", "1.1.1.1", Severity::High, ThreatStatus::Active, 30),
        recorded("a", "2.2.2.2", Severity::High, ThreatStatus::Active, 5),
        recorded("b", "3.3.3.3", Severity::Low, ThreatStatus::Active, 1),
        recorded("c", "4.4.4.4", Severity::High, ThreatStatus::Blocked, 2),
        recorded("d", "5.5.5.5", Severity::High, ThreatStatus::Active, 3),
    ] {
        store.record_threat(&record).await.unwrap();
    }
    let dispatcher = dispatcher(Arc::new(MockBackend::default()), Some(store), false);

    let all = dispatcher.list_threats(24, None, None, 100).await.unwrap();
    assert_eq!(all.count, 4);
    let ips: Vec<&str> = all.threats.iter().map(|t| t.source_ip.as_str()).collect();
    assert_eq!(ips, vec!["3.3.3.3", "4.4.4.4", "5.5.5.5", "2.2.2.2"]);

    let active_high = dispatcher
        .list_threats(24, Some(ThreatStatus::Active), Some(Severity::High), 100)
        .await
        .unwrap();
    let ips: Vec<&str> = active_high.threats.iter().map(|t| t.source_ip.as_str()).collect();
    assert_eq!(ips, vec!["5.5.5.5", "2.2.2.2"]);

    let limited = dispatcher.list_threats(48, None, None, 2).await.unwrap();
    assert_eq!(limited.count, 2);
    assert_eq!(limited.threats[0].source_ip, "3.3.3.3");

    let value = serde_json::to_value(&limited).unwrap();
    assert_eq!(value["count"], 2);
    assert_eq!(value["threats"][0]["status"], "Active");
    assert_eq!(value["threats"][0]["severity"], "Low");
}

#[tokio::test]
async fn test_list_threats_requires_store() {
    let dispatcher = dispatcher(Arc::new(MockBackend::healthy()), None, true);
    assert!(matches!(
        dispatcher.list_threats(24, None, None, 100).await,
        Err(EngineError::NoFallback)
    ));
}
