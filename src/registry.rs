//! Content-type registry: the per-type adapters every flow is instantiated with.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::adapter::{ContentTypeAdapter, LanguageDirectory, PgContentType, PgLanguages};
use crate::config::Config;
use crate::db::Database;
use crate::error::{SyncError, SyncResult};

/// Reference cadence for reconciliation
pub const DEFAULT_RECONCILE_INTERVAL_MINUTES: u32 = 60;

/// A registered content type
#[derive(Clone)]
pub struct ContentTypeEntry {
    pub adapter: Arc<dyn ContentTypeAdapter>,
    pub reconcile_interval_minutes: u32,
}

impl ContentTypeEntry {
    pub fn name(&self) -> &str {
        self.adapter.content_type()
    }
}

/// All content types known to the engine plus the shared language directory.
///
/// Registration order is preserved; backfill and reconcile-all walk types
/// in that order.
pub struct ContentTypeRegistry {
    languages: Arc<dyn LanguageDirectory>,
    entries: Vec<ContentTypeEntry>,
}

impl ContentTypeRegistry {
    pub fn new(languages: Arc<dyn LanguageDirectory>) -> Self {
        Self {
            languages,
            entries: Vec::new(),
        }
    }

    /// Registry of PostgreSQL adapters for every configured content type
    pub fn from_config(db: &Database, config: &Config) -> anyhow::Result<Self> {
        let languages = PgLanguages::new(db.clone(), config.base_language_code.clone());
        let mut registry = Self::new(Arc::new(languages.clone()));

        for content_type in config.content_types()? {
            let interval = config.reconcile_interval_for(&content_type);
            let name = content_type.name.clone();
            let adapter = PgContentType::new(db.clone(), languages.clone(), content_type)?;
            registry
                .register(Arc::new(adapter), interval)
                .with_context(|| format!("Failed to register content type {}", name))?;
        }

        info!("Registered {} content types: {:?}", registry.len(), registry.names());
        Ok(registry)
    }

    /// Register a content type. Names must be unique.
    pub fn register(
        &mut self,
        adapter: Arc<dyn ContentTypeAdapter>,
        reconcile_interval_minutes: u32,
    ) -> SyncResult<()> {
        let name = adapter.content_type();
        if self.get(name).is_some() {
            return Err(SyncError::Validation(format!(
                "content type '{}' registered twice",
                name
            )));
        }
        self.entries.push(ContentTypeEntry {
            adapter,
            reconcile_interval_minutes,
        });
        Ok(())
    }

    pub fn get(&self, content_type: &str) -> Option<&ContentTypeEntry> {
        self.entries.iter().find(|e| e.name() == content_type)
    }

    pub fn adapter(&self, content_type: &str) -> Option<Arc<dyn ContentTypeAdapter>> {
        self.get(content_type).map(|e| Arc::clone(&e.adapter))
    }

    pub fn entries(&self) -> &[ContentTypeEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn languages(&self) -> &dyn LanguageDirectory {
        self.languages.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
