//! Language activation backfill.
//!
//! When a language becomes active after content already exists, every content
//! item of every type gets an auto-synced copy of its base text in the new
//! language. Each type is isolated: a failure is recorded in that type's
//! tally and the remaining types still run. Re-running is harmless.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapter::ContentTypeAdapter;
use crate::error::SyncResult;
use crate::i18n::Language;
use crate::metrics::SyncMetrics;
use crate::reconcile::Reconciler;
use crate::registry::ContentTypeRegistry;
use crate::sync::create_missing_copies;
use crate::translation::Actor;

/// Per content type outcome of a backfill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillTally {
    /// Records created in the new language (and by the follow-up reconciliation)
    pub created: usize,
    /// Records overwritten by the follow-up reconciliation
    pub synced: usize,
    /// Whether any part of this type's backfill failed
    pub failed: bool,
    /// Items that could not be backfilled
    pub item_failures: usize,
    /// The error that stopped this type's scan, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Operator-facing report of one backfill run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackfillSummary {
    pub language_code: String,
    /// Set when the run was a no-op (language or base language unusable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub content_types: BTreeMap<String, BackfillTally>,
}

impl BackfillSummary {
    fn new(language_code: &str) -> Self {
        Self {
            language_code: language_code.to_string(),
            aborted: None,
            content_types: BTreeMap::new(),
        }
    }

    fn aborted(language_code: &str, reason: String) -> Self {
        warn!(language = language_code, "Backfill skipped: {}", reason);
        Self {
            aborted: Some(reason),
            ..Self::new(language_code)
        }
    }

    pub fn total_created(&self) -> usize {
        self.content_types.values().map(|t| t.created).sum()
    }

    pub fn any_failed(&self) -> bool {
        self.aborted.is_some() || self.content_types.values().any(|t| t.failed)
    }
}

pub struct LanguageBackfill {
    registry: Arc<ContentTypeRegistry>,
    actor: Actor,
    metrics: Arc<SyncMetrics>,
}

impl LanguageBackfill {
    pub fn new(registry: Arc<ContentTypeRegistry>, actor: Actor, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            registry,
            actor,
            metrics,
        }
    }

    /// Backfill every content type for `language_code`, then reconcile each type once more.
    pub async fn run(&self, language_code: &str) -> BackfillSummary {
        self.metrics.record_backfill_run();
        let languages = self.registry.languages();

        let language = match languages.resolve_language(language_code).await {
            Ok(Some(language)) if language.is_available() => language,
            Ok(Some(_)) => {
                return BackfillSummary::aborted(language_code, "language is not active".to_string())
            }
            Ok(None) => {
                return BackfillSummary::aborted(language_code, "language not found".to_string())
            }
            Err(e) => return BackfillSummary::aborted(language_code, e.to_string()),
        };

        let base = match languages.resolve_base_language().await {
            Ok(Some(base)) => base,
            Ok(None) => {
                return BackfillSummary::aborted(
                    language_code,
                    "base language could not be resolved".to_string(),
                )
            }
            Err(e) => return BackfillSummary::aborted(language_code, e.to_string()),
        };

        info!(
            language = %language.code,
            base = %base.code,
            content_types = self.registry.len(),
            "Starting language backfill"
        );

        let mut summary = BackfillSummary::new(language_code);

        for entry in self.registry.entries() {
            let mut tally = BackfillTally::default();
            match self
                .backfill_content_type(entry.adapter.as_ref(), &language, &base, &mut tally)
                .await
            {
                Ok(()) => {}
                Err(e) => {
                    warn!(content_type = entry.name(), "Backfill failed: {}", e);
                    tally.error = Some(e.to_string());
                }
            }
            tally.failed = tally.error.is_some() || tally.item_failures > 0;
            summary.content_types.insert(entry.name().to_string(), tally);
        }

        // Second pass covers base text edited while the backfill was running
        for entry in self.registry.entries() {
            let report =
                Reconciler::new(Arc::clone(&entry.adapter), self.actor.clone(), Arc::clone(&self.metrics))
                    .execute()
                    .await;

            let tally = summary
                .content_types
                .entry(entry.name().to_string())
                .or_default();
            tally.synced += report.synced;
            tally.created += report.created;
            if !report.is_clean() {
                tally.failed = true;
            }
        }

        info!(
            language = %language.code,
            created = summary.total_created(),
            failed = summary.any_failed(),
            "Language backfill finished"
        );

        summary
    }

    async fn backfill_content_type(
        &self,
        adapter: &dyn ContentTypeAdapter,
        language: &Language,
        base: &Language,
        tally: &mut BackfillTally,
    ) -> SyncResult<()> {
        let items = adapter.list_all_content_items().await?;

        for content_id in items {
            let records = match adapter.get_translations(content_id).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(
                        content_type = adapter.content_type(),
                        content_id, "Failed to load translations: {}", e
                    );
                    tally.item_failures += 1;
                    continue;
                }
            };

            if records.iter().any(|r| r.language_id == language.id) {
                continue;
            }

            let Some(base_record) = records.iter().find(|r| r.language_id == base.id) else {
                debug!(
                    content_type = adapter.content_type(),
                    content_id, "No base translation, nothing to backfill from"
                );
                continue;
            };

            match create_missing_copies(
                adapter,
                content_id,
                &records,
                [language.id],
                &base_record.fields,
                &self.actor,
            )
            .await
            {
                Ok(created) => tally.created += created,
                Err(e) => {
                    warn!(
                        content_type = adapter.content_type(),
                        content_id, "Failed to backfill translation: {}", e
                    );
                    tally.item_failures += 1;
                }
            }
        }

        info!(
            content_type = adapter.content_type(),
            created = tally.created,
            item_failures = tally.item_failures,
            "Backfilled content type"
        );
        Ok(())
    }
}
