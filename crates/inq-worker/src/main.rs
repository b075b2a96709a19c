use inq_engine::{ClickHouseThreatStore, ElasticClient, SearchAdapter, load_from_env, sync_threats};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = load_from_env()?;

    // connect to elasticsearch
    info!(url = %config.elasticsearch.url, "Connecting to Elasticsearch...");
    let adapter = SearchAdapter::new(Arc::new(ElasticClient::from_config(&config.elasticsearch)?));
    if !adapter.probe().await {
        // keep going, each tick retries the SIEM anyway
        error!("Elasticsearch not reachable yet");
    }

    // connect to clickhouse
    info!(url = %config.clickhouse.url, "Connecting to ClickHouse...");
    let store = ClickHouseThreatStore::from_config(&config.clickhouse);

    // Create table if not exists
    store.ensure_schema().await?;
    info!("Connected to Clickhouse!");

    let window_hours = config.sync.window_hours.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(config.sync.interval_seconds.max(1)));
    info!(
        interval_seconds = config.sync.interval_seconds,
        window_hours,
        "Starting threat sync loop"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match sync_threats(&adapter, &store, window_hours).await {
                    Ok(report) => info!(
                        processed = report.processed,
                        inserted = report.inserted,
                        "Sync tick complete"
                    ),
                    Err(e) => error!("Failed to sync threats: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down threat sync");
                break;
            }
        }
    }

    Ok(())
}
