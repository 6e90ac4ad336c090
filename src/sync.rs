//! The convergence algorithm shared by propagation, reconciliation and backfill.
//!
//! Every writer reads the base text fresh and overwrites auto-synced copies
//! with it. Because the write is an idempotent overwrite, concurrent runs for
//! the same item converge to the same end state without locking.

use serde::Serialize;
use std::collections::HashSet;
use std::ops::AddAssign;
use tracing::{debug, warn};

use crate::adapter::ContentTypeAdapter;
use crate::error::SyncResult;
use crate::translation::{
    Actor, ContentId, LanguageId, NewTranslation, TextFields, TranslationRecord,
};

/// Per-record outcome counters for one convergence pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncTally {
    /// Copies overwritten with the base text
    pub synced: usize,
    /// Copies that already matched the base text (no write issued)
    pub unchanged: usize,
    /// Copies pinned by an editor between read and write
    pub skipped_pinned: usize,
    /// Copies whose write failed
    pub failed: usize,
}

impl AddAssign for SyncTally {
    fn add_assign(&mut self, other: Self) {
        self.synced += other.synced;
        self.unchanged += other.unchanged;
        self.skipped_pinned += other.skipped_pinned;
        self.failed += other.failed;
    }
}

/// Records that sync may overwrite: auto-synced and not in the base language
pub fn synced_copies(
    records: &[TranslationRecord],
    base_language_id: LanguageId,
) -> impl Iterator<Item = &TranslationRecord> {
    records
        .iter()
        .filter(move |r| r.is_synced && r.language_id != base_language_id)
}

/// Overwrite every auto-synced, non-base record in `records` with `fields`.
///
/// Write failures are counted and logged; the loop always runs to the end.
pub async fn converge_copies(
    adapter: &dyn ContentTypeAdapter,
    records: &[TranslationRecord],
    base_language_id: LanguageId,
    fields: &TextFields,
    actor: &Actor,
) -> SyncTally {
    let mut tally = SyncTally::default();

    for record in synced_copies(records, base_language_id) {
        if record.fields == *fields {
            tally.unchanged += 1;
            continue;
        }

        match adapter.update_translation(record.id, fields, actor).await {
            Ok(true) => tally.synced += 1,
            Ok(false) => {
                debug!(
                    content_type = adapter.content_type(),
                    content_id = record.content_id,
                    language_id = record.language_id,
                    "Translation pinned before sync write, left untouched"
                );
                tally.skipped_pinned += 1;
            }
            Err(e) => {
                warn!(
                    content_type = adapter.content_type(),
                    content_id = record.content_id,
                    language_id = record.language_id,
                    "Failed to sync translation: {}",
                    e
                );
                tally.failed += 1;
            }
        }
    }

    tally
}

/// Insert auto-synced copies of `fields` for each of `language_ids` that has
/// no record yet. Returns how many were created.
pub async fn create_missing_copies(
    adapter: &dyn ContentTypeAdapter,
    content_id: ContentId,
    records: &[TranslationRecord],
    language_ids: impl IntoIterator<Item = LanguageId>,
    fields: &TextFields,
    actor: &Actor,
) -> SyncResult<usize> {
    let existing: HashSet<LanguageId> = records.iter().map(|r| r.language_id).collect();
    let mut seen = HashSet::new();
    let missing: Vec<NewTranslation> = language_ids
        .into_iter()
        .filter(|id| !existing.contains(id) && seen.insert(*id))
        .map(|id| NewTranslation::synced(id, fields.clone()))
        .collect();

    if missing.is_empty() {
        return Ok(0);
    }

    adapter.create_translations(content_id, &missing, actor).await?;
    Ok(missing.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{InMemoryContentType, InMemoryLanguages};
    use crate::i18n::Language;

    fn title(text: &str) -> TextFields {
        TextFields::new().with("title", text)
    }

    async fn setup() -> InMemoryContentType {
        let languages = InMemoryLanguages::new("ko");
        for (id, code) in [(1, "ko"), (2, "en"), (3, "ja"), (4, "zh"), (5, "fr")] {
            languages.upsert(Language::new(id, code, code)).unwrap();
        }
        let popups = InMemoryContentType::new("popup", languages);
        popups.add_item(7).unwrap();
        popups
            .create_translations(
                7,
                &[
                    NewTranslation::pinned(1, title("base")),
                    NewTranslation::synced(2, title("old")),
                    NewTranslation::pinned(3, title("hand-written")),
                    NewTranslation::synced(4, title("base")),
                ],
                &Actor::system(),
            )
            .await
            .unwrap();
        popups
    }

    #[tokio::test]
    async fn test_converge_overwrites_only_synced_copies() {
        let popups = setup().await;
        let records = popups.get_translations(7).await.unwrap();

        let tally = converge_copies(&popups, &records, 1, &title("base"), &Actor::system()).await;

        assert_eq!(tally.synced, 1);
        assert_eq!(tally.unchanged, 1);
        assert_eq!(tally.failed, 0);
        assert_eq!(popups.translation(7, 2).unwrap().unwrap().fields, title("base"));
        assert_eq!(
            popups.translation(7, 3).unwrap().unwrap().fields,
            title("hand-written")
        );
    }

    #[tokio::test]
    async fn test_converge_never_writes_base_language() {
        let popups = setup().await;
        // Force the base row into the synced state to prove the language check alone guards it
        let base = popups.translation(7, 1).unwrap().unwrap();
        popups
            .write_translation(base.id, &title("base"), true, &Actor::system())
            .await
            .unwrap();
        let records = popups.get_translations(7).await.unwrap();

        converge_copies(&popups, &records, 1, &title("other"), &Actor::system()).await;

        assert_eq!(popups.translation(7, 1).unwrap().unwrap().fields, title("base"));
    }

    #[tokio::test]
    async fn test_converge_continues_after_failure() {
        let popups = setup().await;
        popups.fail_updates_for(2).unwrap();
        let records = popups.get_translations(7).await.unwrap();

        let tally = converge_copies(&popups, &records, 1, &title("new"), &Actor::system()).await;

        assert_eq!(tally.failed, 1);
        assert_eq!(tally.synced, 1);
        assert_eq!(popups.translation(7, 4).unwrap().unwrap().fields, title("new"));
    }

    #[tokio::test]
    async fn test_converge_counts_pinned_between_read_and_write() {
        let popups = setup().await;
        let records = popups.get_translations(7).await.unwrap();
        // Editor pins `en` after the records were read
        popups
            .write_translation(records[1].id, &title("editor"), false, &Actor::new("editor"))
            .await
            .unwrap();

        let tally = converge_copies(&popups, &records, 1, &title("new"), &Actor::system()).await;

        assert_eq!(tally.skipped_pinned, 1);
        assert_eq!(popups.translation(7, 2).unwrap().unwrap().fields, title("editor"));
    }

    #[tokio::test]
    async fn test_create_missing_copies_skips_existing() {
        let popups = setup().await;
        let records = popups.get_translations(7).await.unwrap();

        let created = create_missing_copies(
            &popups,
            7,
            &records,
            [2, 5, 5],
            &title("base"),
            &Actor::system(),
        )
        .await
        .unwrap();

        assert_eq!(created, 1);
        let french = popups.translation(7, 5).unwrap().unwrap();
        assert!(french.is_synced);
        assert_eq!(french.fields, title("base"));
    }

    #[test]
    fn test_tally_add_assign() {
        let mut total = SyncTally {
            synced: 1,
            unchanged: 2,
            skipped_pinned: 0,
            failed: 1,
        };
        total += SyncTally {
            synced: 3,
            unchanged: 0,
            skipped_pinned: 1,
            failed: 0,
        };
        assert_eq!(
            total,
            SyncTally {
                synced: 4,
                unchanged: 2,
                skipped_pinned: 1,
                failed: 1
            }
        );
    }
}
