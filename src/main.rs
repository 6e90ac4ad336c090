use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use translation_sync::config::Config;
use translation_sync::db::Database;
use translation_sync::registry::ContentTypeRegistry;
use translation_sync::scheduler;
use translation_sync::server::{self, AppState};
use translation_sync::translation::Actor;
use translation_sync::SyncEngine;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_sync=info".parse()?),
        )
        .init();

    info!("Starting translation sync service");

    // Load configuration from environment
    let config = Config::from_env()?;

    let db = Database::connect(&config.database_url).await?;
    let registry = ContentTypeRegistry::from_config(&db, &config)?;
    let engine = Arc::new(SyncEngine::start(
        registry,
        Actor::new(config.system_actor.clone()),
    ));

    let mut jobs = scheduler::start_scheduler(Arc::clone(&engine)).await?;

    let state = AppState::new(Arc::clone(&engine), config.admin_api_key.clone());
    server::serve(state, config.port, shutdown_signal()).await?;

    info!("Shutting down");
    jobs.shutdown().await?;
    engine.shutdown().await;
    db.close().await;

    info!("✓ Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
