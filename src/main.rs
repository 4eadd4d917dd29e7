use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use news_pulse::aggregator::Aggregator;
use news_pulse::config::Config;
use news_pulse::fetcher::HttpFetcher;
use news_pulse::registry::SourceRegistry;
use news_pulse::routes::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "news_pulse=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path =
        std::env::var("NEWS_PULSE_CONFIG").unwrap_or_else(|_| "sources.toml".to_string());
    let config = Config::load(&config_path)?;
    let registry = SourceRegistry::new(config.sources.clone());
    info!("Loaded {} sources from {}", registry.len(), config_path);

    let fetcher = HttpFetcher::from_config(&config).context("building HTTP client")?;
    let aggregator = Aggregator::new(
        Arc::new(fetcher),
        Arc::new(registry),
        config.fetch_timeout(),
    );

    let app = routes::router(Arc::new(AppState { aggregator }));

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;
    info!("Server starting on http://{}", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
