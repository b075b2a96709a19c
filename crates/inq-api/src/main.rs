use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use inq_engine::{
    ClickHouseThreatStore, Dispatcher, ElasticClient, FallbackAggregator, SearchAdapter,
    load_from_env,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

mod handlers;
mod middleware;
mod models;
mod state;

use handlers::{chat_query, health, list_threats, siem_health, sync_from_siem, threat_stats};
use middleware::{API_KEY_ENV, require_api_key};
use state::AppState;

fn router(state: Arc<AppState>) -> Router {
    //routes - protected routes with API key
    let protected_routes = Router::new()
        .route("/api/chat/query", post(chat_query))
        .route("/api/threats", get(list_threats))
        .route("/api/threats/stats", get(threat_stats))
        .route("/api/threats/sync", post(sync_from_siem))
        .route("/api/siem/health", post(siem_health))
        .layer(axum::middleware::from_fn(require_api_key));

    // Health endpoint without auth
    Router::new()
        .route("/health", get(health))
        .merge(protected_routes)
        .with_state(state)
}

// CORS_ORIGIN pins a single origin, otherwise any
fn cors_layer() -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match std::env::var("CORS_ORIGIN").ok().filter(|o| o != "*") {
        Some(origin) => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin = %origin, "Invalid CORS_ORIGIN, allowing any origin");
                layer.allow_origin(Any)
            }
        },
        None => layer.allow_origin(Any),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenvy::dotenv().ok();

    //logging setup
    tracing_subscriber::fmt::init();

    let config = load_from_env()?;

    // Elasticsearch (SIEM)
    info!(url = %config.elasticsearch.url, "Connecting to Elasticsearch...");
    let elastic = ElasticClient::from_config(&config.elasticsearch)?;
    let adapter = SearchAdapter::new(Arc::new(elastic));

    // ClickHouse (threats table, used for fallback statistics)
    info!(url = %config.clickhouse.url, "Connecting to ClickHouse...");
    let store = ClickHouseThreatStore::from_config(&config.clickhouse);
    match store.ensure_schema().await {
        Ok(()) => info!("Connected to ClickHouse!"),
        Err(e) => warn!(error = %e, "ClickHouse not reachable, fallback statistics will fail until it is"),
    }
    let fallback = FallbackAggregator::new(Arc::new(store));

    // one startup probe, after this only POST /api/siem/health changes the status
    let dispatcher = Dispatcher::connect(adapter, Some(fallback), config.thresholds).await;
    info!(siem = dispatcher.status().as_str(), "Query engine ready!");

    let state = Arc::new(AppState::new(dispatcher));
    let app = router(state).layer(cors_layer());

    // Log if API key is enabled
    if std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty()).is_some() {
        info!("API key authentication ENABLED");
    } else {
        info!("API key authentication DISABLED (set {} to enable)", API_KEY_ENV);
    }

    // Server start
    let addr = config.server.addr.clone();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
