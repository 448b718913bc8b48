use std::sync::Arc;
use anyhow::Context;
use tokio::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use axum_taskboard::{
    config::Config,
    routes,
    services::{EntityStore, RedisService},
    state::AppState,
    worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_taskboard=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuses to start without a usable connection string
    let config = Config::load().context("Failed to load configuration")?;

    let store: Arc<dyn EntityStore> = Arc::new(
        RedisService::connect(&config.database.url)
            .await
            .context("Failed to connect to the document store")?,
    );

    if config.repair.interval_secs > 0 {
        let period = Duration::from_secs(config.repair.interval_secs);
        tokio::spawn(worker::repair_process(store.clone(), period));
    }

    let address = format!("{}:{}", config.server.host, config.server.port);
    let app = routes::app(AppState::new(store, config));

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
