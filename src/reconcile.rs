//! Reconciliation: periodic re-derivation of every auto-synced copy from its
//! base record. The self-healing backstop for missed or failed propagation.
//!
//! Safe to run any number of times and concurrently with propagation: it
//! reads the base text fresh per item and only ever overwrites synced rows.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapter::ContentTypeAdapter;
use crate::error::{SyncError, SyncResult};
use crate::metrics::SyncMetrics;
use crate::sync::{converge_copies, create_missing_copies, SyncTally};
use crate::translation::{Actor, ContentId, LanguageId};

/// Summary of one reconciliation run for one content type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub content_type: String,
    pub items_scanned: usize,
    pub synced: usize,
    pub unchanged: usize,
    /// Copies created for active languages the item had no record for
    pub created: usize,
    pub skipped_pinned: usize,
    /// Items without a base-language record
    pub skipped_no_base: usize,
    /// Record writes that failed
    pub failed: usize,
    /// Items whose processing stopped on an error
    pub item_failures: usize,
    /// Set when the run stopped before scanning the corpus
    pub aborted: Option<String>,
}

impl ReconcileReport {
    fn new(content_type: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            ..Self::default()
        }
    }

    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.failed == 0 && self.item_failures == 0
    }

    fn absorb(&mut self, tally: SyncTally) {
        self.synced += tally.synced;
        self.unchanged += tally.unchanged;
        self.skipped_pinned += tally.skipped_pinned;
        self.failed += tally.failed;
    }
}

enum ItemOutcome {
    Reconciled { tally: SyncTally, created: usize },
    NoBase,
}

/// Reconciliation entry point for one content type
#[derive(Clone)]
pub struct Reconciler {
    adapter: Arc<dyn ContentTypeAdapter>,
    actor: Actor,
    metrics: Arc<SyncMetrics>,
}

impl Reconciler {
    pub fn new(adapter: Arc<dyn ContentTypeAdapter>, actor: Actor, metrics: Arc<SyncMetrics>) -> Self {
        Self {
            adapter,
            actor,
            metrics,
        }
    }

    pub fn content_type(&self) -> &str {
        self.adapter.content_type()
    }

    /// Run one full pass. Never fails: errors end up in the report and logs.
    pub async fn execute(&self) -> ReconcileReport {
        let content_type = self.adapter.content_type();
        let mut report = ReconcileReport::new(content_type);
        self.metrics.record_reconcile_run();

        info!(content_type, "Starting reconciliation");

        if let Err(e) = self.scan(&mut report).await {
            warn!(content_type, "Reconciliation aborted: {}", e);
            report.aborted = Some(e.to_string());
        }

        info!(
            content_type,
            items = report.items_scanned,
            synced = report.synced,
            created = report.created,
            unchanged = report.unchanged,
            failed = report.failed,
            item_failures = report.item_failures,
            "Reconciliation finished"
        );

        report
    }

    /// `execute` for callers that hand the reconciler off, e.g. to `join_all`
    pub async fn execute_owned(self) -> ReconcileReport {
        self.execute().await
    }

    async fn scan(&self, report: &mut ReconcileReport) -> SyncResult<()> {
        let base = self
            .adapter
            .resolve_base_language()
            .await?
            .ok_or_else(|| SyncError::not_found("base language", "configured code"))?;

        let active: Vec<LanguageId> = self
            .adapter
            .list_active_languages()
            .await?
            .into_iter()
            .map(|lang| lang.id)
            .filter(|id| *id != base.id)
            .collect();

        let items = self.adapter.list_all_content_items().await?;

        for content_id in items {
            report.items_scanned += 1;
            match self.reconcile_item(content_id, base.id, &active).await {
                Ok(ItemOutcome::Reconciled { tally, created }) => {
                    self.metrics.record_tally(&tally);
                    report.absorb(tally);
                    report.created += created;
                }
                Ok(ItemOutcome::NoBase) => {
                    warn!(
                        content_type = self.adapter.content_type(),
                        content_id,
                        base_language = %base.code,
                        "No base translation to sync from, skipping"
                    );
                    report.skipped_no_base += 1;
                }
                Err(e) => {
                    warn!(
                        content_type = self.adapter.content_type(),
                        content_id,
                        "Failed to reconcile item: {}",
                        e
                    );
                    report.item_failures += 1;
                }
            }
        }

        Ok(())
    }

    async fn reconcile_item(
        &self,
        content_id: ContentId,
        base_language_id: LanguageId,
        active: &[LanguageId],
    ) -> SyncResult<ItemOutcome> {
        let records = self.adapter.get_translations(content_id).await?;
        let Some(base) = records.iter().find(|r| r.language_id == base_language_id) else {
            return Ok(ItemOutcome::NoBase);
        };

        let tally = converge_copies(
            self.adapter.as_ref(),
            &records,
            base_language_id,
            &base.fields,
            &self.actor,
        )
        .await;

        let created = create_missing_copies(
            self.adapter.as_ref(),
            content_id,
            &records,
            active.iter().copied(),
            &base.fields,
            &self.actor,
        )
        .await?;

        Ok(ItemOutcome::Reconciled { tally, created })
    }
}
