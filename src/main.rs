use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_aggregator::config::Config;
use news_aggregator::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_aggregator=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var("NEWS_CONFIG").unwrap_or_else(|_| "feeds.toml".to_string());
    let config = Config::load_or_default(&config_path)?;
    info!(
        "Loaded {} feeds ({} fetched per run), cache TTL {}s",
        config.feeds.len(),
        config.feeds.len().min(config.max_sources),
        config.cache_ttl_secs
    );

    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
