// Inquisitor engine - interprets security questions and answers them from the SIEM

pub mod adapter;
pub mod aggregate;
pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod elastic;
pub mod envelope;
pub mod fallback;
pub mod query_analyzer;
pub mod store;
pub mod sync;

pub use adapter::{SearchAdapter, SiemStatistics};
pub use backend::{BackendError, ClusterHealth, CountBucket, SearchBackend, SearchPage, TermsField};
pub use config::{ConfigError, InquisitorConfig, Thresholds, load_config, load_from_env};
pub use dispatcher::{Dispatcher, EngineError, QueryOutcome, SiemStatus, ThreatStatsReport};
pub use elastic::ElasticClient;
pub use envelope::{Envelope, Payload, StatisticsData};
pub use fallback::{FallbackAggregator, FallbackStatistics, ThreatList};
pub use query_analyzer::{AnalyzedQuery, Intent, QueryAnalyzer, Timeframe};
pub use store::{ClickHouseThreatStore, StoreError, ThreatQuery, ThreatStore};
pub use sync::{SyncReport, sync_threats};
