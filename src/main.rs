use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use astock_analytics::cache::QuoteCache;
use astock_analytics::config::Config;
use astock_analytics::engine::{JobEngine, ProgressStore};
use astock_analytics::gateway::DataGateway;
use astock_analytics::provider::primary::PrimaryProvider;
use astock_analytics::provider::secondary::SecondaryProvider;
use astock_analytics::server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let primary = Arc::new(PrimaryProvider::new(config.primary_provider_token.clone()));
    let secondary = Arc::new(SecondaryProvider::new(config.secondary_provider_endpoint.clone()));
    let cache = Arc::new(QuoteCache::new(config.cache_size));
    let gateway = Arc::new(DataGateway::new(primary, secondary, cache, &config));
    let store = Arc::new(ProgressStore::new(config.job_retention));
    let engine = Arc::new(JobEngine::new(gateway, store, &config));

    let app = server::router(engine);
    let addr = config.http_bind_addr.clone();
    tracing::info!("starting astock-analytics HTTP server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
