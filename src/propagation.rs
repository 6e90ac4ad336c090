//! Update propagation: apply a base-translation edit to every auto-synced copy.
//!
//! Runs on the propagation worker, never on the editorial write path. It is
//! a terminal error boundary: every failure becomes a `Dropped` outcome or a
//! failure count, and reconciliation repairs whatever was missed.

use std::fmt;
use tracing::{debug, info, warn};

use crate::adapter::ContentTypeAdapter;
use crate::events::BaseTranslationUpdated;
use crate::sync::{converge_copies, SyncTally};

/// Why an event was discarded without writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The content item was deleted after the edit
    ContentMissing,
    /// The base language is no longer configured or active
    BaseLanguageUnresolved,
    /// The base language moved since the event was published
    BaseLanguageChanged,
    /// A lookup needed before any write failed
    Storage(String),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentMissing => write!(f, "content item no longer exists"),
            Self::BaseLanguageUnresolved => write!(f, "base language could not be resolved"),
            Self::BaseLanguageChanged => write!(f, "event language is no longer the base"),
            Self::Storage(e) => write!(f, "storage error: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationOutcome {
    Applied(SyncTally),
    Dropped(DropReason),
}

/// Handle one `BaseTranslationUpdated` event for its content type.
///
/// Existence and base language are re-checked here, at execution time.
pub async fn handle_base_translation_updated(
    adapter: &dyn ContentTypeAdapter,
    event: &BaseTranslationUpdated,
) -> PropagationOutcome {
    let outcome = propagate(adapter, event).await;

    match &outcome {
        PropagationOutcome::Applied(tally) => info!(
            content_type = adapter.content_type(),
            content_id = event.content_id,
            synced = tally.synced,
            unchanged = tally.unchanged,
            failed = tally.failed,
            "Propagated base translation"
        ),
        PropagationOutcome::Dropped(reason @ DropReason::Storage(_)) => warn!(
            content_type = adapter.content_type(),
            content_id = event.content_id,
            "Propagation aborted, reconciliation will repair: {}",
            reason
        ),
        PropagationOutcome::Dropped(reason) => debug!(
            content_type = adapter.content_type(),
            content_id = event.content_id,
            "Dropped base translation event: {}",
            reason
        ),
    }

    outcome
}

async fn propagate(
    adapter: &dyn ContentTypeAdapter,
    event: &BaseTranslationUpdated,
) -> PropagationOutcome {
    match adapter.content_item_exists(event.content_id).await {
        Ok(true) => {}
        Ok(false) => return PropagationOutcome::Dropped(DropReason::ContentMissing),
        Err(e) => return PropagationOutcome::Dropped(DropReason::Storage(e.to_string())),
    }

    match adapter.resolve_base_language().await {
        Ok(Some(base)) if base.id == event.language_id => {}
        Ok(Some(_)) => return PropagationOutcome::Dropped(DropReason::BaseLanguageChanged),
        Ok(None) => return PropagationOutcome::Dropped(DropReason::BaseLanguageUnresolved),
        Err(e) => return PropagationOutcome::Dropped(DropReason::Storage(e.to_string())),
    }

    let records = match adapter.get_translations(event.content_id).await {
        Ok(records) => records,
        Err(e) => return PropagationOutcome::Dropped(DropReason::Storage(e.to_string())),
    };

    let tally = converge_copies(
        adapter,
        &records,
        event.language_id,
        &event.fields,
        &event.actor,
    )
    .await;

    PropagationOutcome::Applied(tally)
}
