//! One-shot language activation backfill.
//!
//! Usage: backfill <language-code>
//!
//! Run after activating a language so every existing content item gets an
//! auto-synced copy in it. Safe to re-run.

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
                .add_directive("backfill=info".parse()?),
        )
        .init();

    let Some(language_code) = std::env::args().nth(1) else {
        bail!("Usage: backfill <language-code>");
    };

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url).await?;
    let registry = ContentTypeRegistry::from_config(&db, &config)?;
    let engine = SyncEngine::start(registry, Actor::new(config.system_actor.clone()));

    let summary = engine.backfill_language(&language_code).await;
    engine.shutdown().await;
    db.close().await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(reason) = &summary.aborted {
        bail!("Backfill for {} did not run: {}", language_code, reason);
    }
    if summary.any_failed() {
        bail!("Backfill for {} finished with failures", language_code);
    }

    info!("✓ Backfilled {} records for {}", summary.total_created(), language_code);
    Ok(())
}
