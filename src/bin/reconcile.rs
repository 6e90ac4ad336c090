//! One-shot reconciliation.
//!
//! Usage: reconcile [content-type]
//!
//! Reconciles the named content type, or every configured type when no
//! argument is given.

use anyhow::{bail, Result};
use tracing::info;
use translation_sync::config::Config;
use translation_sync::db::Database;
use translation_sync::registry::ContentTypeRegistry;
use translation_sync::translation::Actor;
use translation_sync::SyncEngine;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("translation_sync=info".parse()?)
                .add_directive("reconcile=info".parse()?),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url).await?;
    let registry = ContentTypeRegistry::from_config(&db, &config)?;
    let engine = SyncEngine::start(registry, Actor::new(config.system_actor.clone()));

    let reports = match std::env::args().nth(1) {
        Some(content_type) => vec![engine.reconcile(&content_type).await?],
        None => engine.reconcile_all().await,
    };
    engine.shutdown().await;
    db.close().await;

    println!("{}", serde_json::to_string_pretty(&reports)?);

    let unclean: Vec<&str> = reports
        .iter()
        .filter(|r| !r.is_clean())
        .map(|r| r.content_type.as_str())
        .collect();
    if !unclean.is_empty() {
        bail!("Reconciliation finished with errors for: {}", unclean.join(", "));
    }

    info!("✓ Reconciled {} content types", reports.len());
    Ok(())
}
