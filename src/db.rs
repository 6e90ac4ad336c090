use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::info;

use crate::retry::{with_retry, RetryPolicy};

/// Shared PostgreSQL pool used by every content-type adapter
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with the default startup retry policy
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::connect_with_policy(database_url, &RetryPolicy::database_connect()).await
    }

    pub async fn connect_with_policy(database_url: &str, policy: &RetryPolicy) -> Result<Self> {
        let pool = with_retry(policy, "Database connect", || async {
            PgPoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(10))
                .connect(database_url)
                .await
        })
        .await
        .context("Failed to connect to PostgreSQL")?;

        info!("✓ Connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
