//! Storefront Forms - order-form configurator and checkout service

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_forms::api::{router, AppState};
use storefront_forms::config::AppConfig;
use storefront_forms::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_filter.as_str().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = match &config.database_url {
        Some(url) => DocumentStore::connect(url, config.db_max_connections).await?,
        None => {
            tracing::warn!("DATABASE_URL not set, keeping forms and orders in memory");
            DocumentStore::in_memory()
        }
    };
    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, order events will not be published");
                None
            }
        },
        None => None,
    };
    let app = router(AppState { store, nats, pixel_timing: config.pixel_timing });
    tracing::info!("Storefront Forms listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
