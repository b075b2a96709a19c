// Elasticsearch client
// Speaks the REST API directly: _search, _count and _cluster/health

use async_trait::async_trait;
use inq_core::{SecurityEvent, Severity};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use crate::backend::{BackendError, ClusterHealth, CountBucket, SearchBackend, SearchPage, TermsField};
use crate::config::ElasticConfig;
use crate::query_analyzer::Timeframe;

const FAILED_LOGIN_LIMIT: usize = 1000;
const THREAT_LIMIT: usize = 500;
const SEARCH_LIMIT: usize = 100;
const AGG_NAME: &str = "by_term";

#[derive(Debug, Clone)]
pub struct ElasticClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    logs_index: String,
    security_index: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
    #[serde(default)]
    aggregations: Option<Aggregations>,
}

#[derive(Deserialize)]
struct Hits {
    #[serde(default)]
    total: Option<TotalHits>,
    #[serde(default)]
    hits: Vec<Hit>,
}

// ES 7+ reports {"value": n, "relation": ..}, older clusters a bare number
#[derive(Deserialize)]
#[serde(untagged)]
enum TotalHits {
    Object { value: u64 },
    Count(u64),
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[derive(Deserialize)]
struct Aggregations {
    by_term: TermsAggregation,
}

#[derive(Deserialize)]
struct TermsAggregation {
    buckets: Vec<TermsBucket>,
}

#[derive(Deserialize)]
struct TermsBucket {
    key: Value,
    doc_count: u64,
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

impl ElasticClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let defaults = ElasticConfig::default();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
            logs_index: defaults.logs_index,
            security_index: defaults.security_index,
        }
    }

    /// Build from config, the transport timeout is the only timeout on SIEM calls
    pub fn from_config(config: &ElasticConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            logs_index: config.logs_index.clone(),
            security_index: config.security_index.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(user) => request.basic_auth(user, self.password.as_deref()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = self.authorize(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BackendError::ApiError(format!("{}: {}", status, error_text)));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn search_index(&self, index: &str, body: &Value) -> Result<SearchResponse, BackendError> {
        let url = format!("{}/{}/_search", self.base_url, index);
        self.send(self.client.post(&url).json(body)).await
    }
}

#[async_trait]
impl SearchBackend for ElasticClient {
    async fn failed_logins(&self, hours: u32) -> Result<Vec<SecurityEvent>, BackendError> {
        let response = self.search_index(&self.logs_index, &failed_logins_body(hours)).await?;
        Ok(into_page(response).events)
    }

    async fn threats(
        &self,
        hours: u32,
        severity: Option<Severity>,
    ) -> Result<Vec<SecurityEvent>, BackendError> {
        let response = self
            .search_index(&self.security_index, &threats_body(hours, severity))
            .await?;
        Ok(into_page(response).events)
    }

    async fn search(&self, filter: &str, timeframe: Timeframe) -> Result<SearchPage, BackendError> {
        let response = self.search_index(&self.logs_index, &search_body(filter, timeframe)).await?;
        Ok(into_page(response))
    }

    async fn count_events(&self, hours: u32) -> Result<u64, BackendError> {
        let url = format!("{}/{}/_count", self.base_url, self.logs_index);
        let response: CountResponse = self.send(self.client.post(&url).json(&count_body(hours))).await?;
        Ok(response.count)
    }

    async fn top_terms(
        &self,
        field: TermsField,
        hours: u32,
        size: usize,
    ) -> Result<Vec<CountBucket>, BackendError> {
        let response = self
            .search_index(&self.security_index, &terms_body(field, hours, size))
            .await?;
        into_buckets(response)
    }

    async fn health(&self) -> Result<ClusterHealth, BackendError> {
        let url = format!("{}/_cluster/health", self.base_url);
        self.send(self.client.get(&url)).await
    }

    fn name(&self) -> &str {
        "elasticsearch"
    }
}

// QUERY BODIES //

fn time_range(hours: u32) -> Value {
    json!({ "range": { "@timestamp": { "gte": format!("now-{}h", hours), "lte": "now" } } })
}

fn failed_logins_body(hours: u32) -> Value {
    json!({
        "query": { "bool": { "must": [
            { "match": { "event.action": "authentication_failure" } },
            time_range(hours),
        ] } },
        "size": FAILED_LOGIN_LIMIT,
        "sort": [{ "@timestamp": "desc" }]
    })
}

fn threats_body(hours: u32, severity: Option<Severity>) -> Value {
    let mut must = vec![time_range(hours)];
    if let Some(severity) = severity {
        must.push(json!({ "match": { "event.severity": severity.as_str() } }));
    }
    json!({
        "query": { "bool": { "must": must } },
        "size": THREAT_LIMIT,
        "sort": [{ "@timestamp": "desc" }]
    })
}

fn search_body(filter: &str, timeframe: Timeframe) -> Value {
    json!({
        "query": { "bool": { "must": [
            { "query_string": { "query": filter } },
            { "range": { "@timestamp": { "gte": format!("now-{}", timeframe.label()), "lte": "now" } } },
        ] } },
        "size": SEARCH_LIMIT,
        "track_total_hits": true
    })
}

fn count_body(hours: u32) -> Value {
    json!({ "query": time_range(hours) })
}

fn terms_body(field: TermsField, hours: u32, size: usize) -> Value {
    let field_name = match field {
        TermsField::Severity => "event.severity.keyword",
        TermsField::SourceIp => "source.ip.keyword",
    };
    json!({
        "query": time_range(hours),
        "aggs": { AGG_NAME: { "terms": { "field": field_name, "size": size } } },
        "size": 0
    })
}

// RESPONSE MAPPING //

fn into_page(response: SearchResponse) -> SearchPage {
    let events: Vec<SecurityEvent> = response
        .hits
        .hits
        .into_iter()
        .map(|hit| SecurityEvent::from_document(hit.id, &hit.source))
        .collect();

    let total = match response.hits.total {
        Some(TotalHits::Object { value }) => value,
        Some(TotalHits::Count(n)) => n,
        None => events.len() as u64,
    };

    SearchPage { total, events }
}

fn into_buckets(response: SearchResponse) -> Result<Vec<CountBucket>, BackendError> {
    let aggregations = response
        .aggregations
        .ok_or_else(|| BackendError::Malformed("missing aggregations".to_string()))?;

    Ok(aggregations
        .by_term
        .buckets
        .into_iter()
        .map(|b| {
            let key = match b.key {
                Value::String(s) => s,
                other => other.to_string(),
            };
            CountBucket::new(key, b.doc_count)
        })
        .collect())
}
