// Threat store
// Relational side of the system: the `threats` table in ClickHouse.
// Read by the fallback aggregator and the threat listing, written by the SIEM sync job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clickhouse::Client;
use inq_core::{Severity, ThreatRecord, ThreatStatus};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::backend::CountBucket;
use crate::config::ClickHouseConfig;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] clickhouse::error::Error),

    #[error("Invalid threat details: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid threat row: {0}")]
    Decode(String),
}

/// Filter for listing recorded threats, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct ThreatQuery {
    pub since: DateTime<Utc>,
    pub status: Option<ThreatStatus>,
    pub severity: Option<Severity>,
    pub limit: usize,
}

/// Grouped counts over rows with `detected_at >= since`
#[async_trait]
pub trait ThreatStore: Send + Sync {
    async fn severity_counts(&self, since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError>;

    async fn status_counts(&self, since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError>;

    /// Most frequent source IPs, ties broken by earliest detection
    async fn top_source_ips(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountBucket>, StoreError>;

    /// Recorded threats matching `query`, newest first, at most `query.limit`
    async fn list_threats(&self, query: &ThreatQuery) -> Result<Vec<ThreatRecord>, StoreError>;

    async fn has_siem_event(&self, siem_event_id: &str) -> Result<bool, StoreError>;

    async fn record_threat(&self, record: &ThreatRecord) -> Result<(), StoreError>;
}

// Row shape for reads, ids and timestamps come back as plain scalars
#[derive(Debug, Deserialize, clickhouse::Row)]
struct ThreatRow {
    id: String,
    threat_type: String,
    severity: String,
    source_ip: String,
    target_ip: Option<String>,
    target_port: Option<u16>,
    status: String,
    country: Option<String>,
    detected_at_ms: i64,
    siem_event_id: Option<String>,
    details: String,
}

impl ThreatRow {
    fn into_record(self) -> Result<ThreatRecord, StoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| StoreError::Decode(format!("id {}: {}", self.id, e)))?;
        let detected_at = DateTime::from_timestamp_millis(self.detected_at_ms)
            .ok_or_else(|| StoreError::Decode(format!("detected_at {}", self.detected_at_ms)))?;

        Ok(ThreatRecord {
            id,
            threat_type: self.threat_type,
            severity: Severity::or_default(Some(&self.severity)),
            source_ip: self.source_ip,
            target_ip: self.target_ip,
            target_port: self.target_port,
            status: ThreatStatus::parse(&self.status).unwrap_or_default(),
            country: self.country,
            detected_at,
            siem_event_id: self.siem_event_id,
            details: serde_json::from_str(&self.details)?,
        })
    }
}

pub struct ClickHouseThreatStore {
    clickhouse: Client,
}

impl ClickHouseThreatStore {
    pub fn new(clickhouse: Client) -> Self {
        Self { clickhouse }
    }

    pub fn from_config(config: &ClickHouseConfig) -> Self {
        let mut client = Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        if let Some(user) = &config.user {
            client = client.with_user(user);
        }
        if let Some(password) = &config.password {
            client = client.with_password(password);
        }
        Self::new(client)
    }

    // Create table if not exists
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.clickhouse
            .query(
                r#"
            CREATE TABLE IF NOT EXISTS threats (
                id UUID,
                threat_type String,
                severity String,
                source_ip String,
                target_ip Nullable(String),
                target_port Nullable(UInt16),
                status String,
                country Nullable(String),
                detected_at DateTime64(3),
                siem_event_id Nullable(String),
                details String
            ) ENGINE = MergeTree()
            ORDER BY (detected_at, source_ip)
            PARTITION BY toYYYYMM(detected_at)
        "#,
            )
            .execute()
            .await?;

        info!("Threats table ready");
        Ok(())
    }

    async fn grouped_counts(
        &self,
        column: &str,
        since: DateTime<Utc>,
        limit: Option<usize>,
    ) -> Result<Vec<CountBucket>, StoreError> {
        let sql = grouped_counts_sql(column, limit.is_some());

        let mut query = self.clickhouse.query(&sql).bind(since.timestamp_millis());
        if let Some(limit) = limit {
            query = query.bind(limit as u64);
        }
        let rows: Vec<(String, u64)> = query.fetch_all().await?;

        Ok(rows.into_iter().map(|(key, count)| CountBucket::new(key, count)).collect())
    }
}

fn grouped_counts_sql(column: &str, limited: bool) -> String {
    let mut sql = format!(
        "SELECT {column}, count() AS cnt
             FROM threats
             WHERE detected_at >= fromUnixTimestamp64Milli(?)
             GROUP BY {column}
             ORDER BY cnt DESC, min(detected_at) ASC"
    );
    if limited {
        sql.push_str("\n             LIMIT ?");
    }
    sql
}

// placeholders bind in order: since, status?, severity?, limit
fn list_threats_sql(query: &ThreatQuery) -> String {
    let mut conditions = vec!["detected_at >= fromUnixTimestamp64Milli(?)"];
    if query.status.is_some() {
        conditions.push("status = ?");
    }
    if query.severity.is_some() {
        conditions.push("severity = ?");
    }

    format!(
        "SELECT toString(id) AS id, threat_type, severity, source_ip, target_ip, target_port, status, country,
                toUnixTimestamp64Milli(detected_at) AS detected_at_ms, siem_event_id, details
         FROM threats
         WHERE {}
         ORDER BY detected_at DESC
         LIMIT ?",
        conditions.join(" AND ")
    )
}

#[async_trait]
impl ThreatStore for ClickHouseThreatStore {
    async fn severity_counts(&self, since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError> {
        self.grouped_counts("severity", since, None).await
    }

    async fn status_counts(&self, since: DateTime<Utc>) -> Result<Vec<CountBucket>, StoreError> {
        self.grouped_counts("status", since, None).await
    }

    async fn top_source_ips(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<CountBucket>, StoreError> {
        self.grouped_counts("source_ip", since, Some(limit)).await
    }

    async fn list_threats(&self, query: &ThreatQuery) -> Result<Vec<ThreatRecord>, StoreError> {
        let sql = list_threats_sql(query);

        let mut select = self.clickhouse.query(&sql).bind(query.since.timestamp_millis());
        if let Some(status) = query.status {
            select = select.bind(status.as_str());
        }
        if let Some(severity) = query.severity {
            select = select.bind(severity.as_str());
        }
        let rows: Vec<ThreatRow> = select.bind(query.limit as u64).fetch_all().await?;

        rows.into_iter().map(ThreatRow::into_record).collect()
    }

    async fn has_siem_event(&self, siem_event_id: &str) -> Result<bool, StoreError> {
        let count: u64 = self
            .clickhouse
            .query("SELECT count() FROM threats WHERE siem_event_id = ?")
            .bind(siem_event_id)
            .fetch_one()
            .await?;
        Ok(count > 0)
    }

    async fn record_threat(&self, record: &ThreatRecord) -> Result<(), StoreError> {
        let details = serde_json::to_string(&record.details)?;

        self.clickhouse
            .query(
                r#"
            INSERT INTO threats (id, threat_type, severity, source_ip, target_ip, target_port, status, country, detected_at, siem_event_id, details)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, fromUnixTimestamp64Milli(?), ?, ?)
        "#,
            )
            .bind(record.id.to_string())
            .bind(&record.threat_type)
            .bind(record.severity.as_str())
            .bind(&record.source_ip)
            .bind(&record.target_ip)
            .bind(record.target_port)
            .bind(record.status.as_str())
            .bind(&record.country)
            .bind(record.detected_at.timestamp_millis())
            .bind(&record.siem_event_id)
            .bind(details)
            .execute()
            .await?;

        info!(id = %record.id, source_ip = %record.source_ip, "Threat stored in ClickHouse");
        Ok(())
    }
}
