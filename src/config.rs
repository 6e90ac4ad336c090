use anyhow::{bail, Context, Result};

use crate::content_types::{load_content_types, ContentTypeConfig};
use crate::registry::DEFAULT_RECONCILE_INTERVAL_MINUTES;

#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_url: String,

    // Languages
    pub base_language_code: String,

    // Reconciliation
    pub reconcile_interval_minutes: u32,
    pub content_types_file: Option<String>,

    // Background writes are stamped with this actor
    pub system_actor: String,

    // Admin surface
    pub admin_api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            // Database
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            // Languages
            base_language_code: std::env::var("BASE_LANGUAGE_CODE")
                .unwrap_or_else(|_| "ko".to_string()),

            // Reconciliation
            reconcile_interval_minutes: std::env::var("RECONCILE_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RECONCILE_INTERVAL_MINUTES),
            content_types_file: non_empty_var("CONTENT_TYPES_FILE"),

            system_actor: std::env::var("SYSTEM_ACTOR").unwrap_or_else(|_| "system".to_string()),

            // Admin surface
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.base_language_code.trim().is_empty() {
            bail!("BASE_LANGUAGE_CODE must not be empty");
        }
        if !(1..=1440).contains(&self.reconcile_interval_minutes) {
            bail!(
                "RECONCILE_INTERVAL_MINUTES must be between 1 and 1440, got {}",
                self.reconcile_interval_minutes
            );
        }
        Ok(())
    }

    /// Content types to sync: the configured file, or the built-in set
    pub fn content_types(&self) -> Result<Vec<ContentTypeConfig>> {
        load_content_types(self.content_types_file.as_deref())
    }

    /// Reconciliation cadence for one content type
    pub fn reconcile_interval_for(&self, content_type: &ContentTypeConfig) -> u32 {
        content_type
            .reconcile_interval_minutes
            .unwrap_or(self.reconcile_interval_minutes)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
