//! Creation flow: write the caller's translations, then fan out auto-synced
//! copies to every other active language.

use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::adapter::ContentTypeAdapter;
use crate::error::{SyncError, SyncResult};
use crate::i18n::{find_duplicate_language, remaining_languages, select_base_translation, BaseSelection};
use crate::sync::create_missing_copies;
use crate::translation::{Actor, ContentId, LanguageId, NewTranslation, TranslationInput};

/// What a creation wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreationReport {
    /// Pinned records from caller input
    pub explicit: usize,
    /// Auto-synced records fanned out from the base translation
    pub derived: usize,
    pub base_language_id: LanguageId,
}

/// Create the translations of a freshly created content item.
///
/// Validation and language lookups all happen before the first write. The
/// explicit and derived batches are separate inserts; if the derived batch
/// fails the error is returned and reconciliation later fills the gap.
pub async fn create_translations(
    adapter: &dyn ContentTypeAdapter,
    content_id: ContentId,
    inputs: &[TranslationInput],
    actor: &Actor,
) -> SyncResult<CreationReport> {
    if inputs.is_empty() {
        return Err(SyncError::Validation(
            "at least one translation is required".to_string(),
        ));
    }
    if let Some(language_id) = find_duplicate_language(inputs) {
        return Err(SyncError::Validation(format!(
            "language {} supplied more than once",
            language_id
        )));
    }

    for input in inputs {
        if adapter.find_language(input.language_id).await?.is_none() {
            return Err(SyncError::not_found("language", input.language_id));
        }
    }

    let configured_base = adapter.resolve_base_language().await?;
    let active = adapter.list_active_languages().await?;

    let Some((base, selection)) = select_base_translation(inputs, configured_base.as_ref()) else {
        return Err(SyncError::Validation(
            "at least one translation is required".to_string(),
        ));
    };
    if selection == BaseSelection::FirstProvided {
        warn!(
            content_type = adapter.content_type(),
            content_id,
            fallback_language_id = base.language_id,
            configured_base = configured_base.as_ref().map(|l| l.code.as_str()),
            "Configured base language not provided; using first translation as sync source"
        );
    }

    let explicit: Vec<NewTranslation> = inputs
        .iter()
        .map(|input| NewTranslation::pinned(input.language_id, input.fields.clone()))
        .collect();
    adapter
        .create_translations(content_id, &explicit, actor)
        .await?;

    let provided: HashSet<LanguageId> = inputs.iter().map(|i| i.language_id).collect();
    let targets: Vec<LanguageId> = remaining_languages(&active, &provided)
        .into_iter()
        .map(|lang| lang.id)
        .collect();

    // A reconciliation gap-fill may land between the two batches; languages
    // it already wrote are skipped.
    let mut derived = 0;
    if !targets.is_empty() {
        let written: SyncResult<usize> = async {
            let records = adapter.get_translations(content_id).await?;
            create_missing_copies(adapter, content_id, &records, targets, &base.fields, actor).await
        }
        .await;
        derived = match written {
            Ok(count) => count,
            Err(e) => {
                warn!(
                    content_type = adapter.content_type(),
                    content_id,
                    "Derived translations not written, reconciliation will fill them: {}",
                    e
                );
                return Err(e);
            }
        };
    }

    info!(
        content_type = adapter.content_type(),
        content_id,
        explicit = explicit.len(),
        derived,
        "Created translations"
    );

    Ok(CreationReport {
        explicit: explicit.len(),
        derived,
        base_language_id: base.language_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{InMemoryContentType, InMemoryLanguages, LanguageDirectory};
    use crate::i18n::Language;
    use crate::metrics::SyncMetrics;
    use crate::reconcile::Reconciler;
    use crate::translation::{TextFields, TranslationId, TranslationRecord};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn title(text: &str) -> TextFields {
        TextFields::new().with("title", text)
    }

    fn setup() -> (InMemoryLanguages, InMemoryContentType) {
        let languages = InMemoryLanguages::new("ko");
        languages.upsert(Language::new(1, "ko", "Korean")).unwrap();
        languages.upsert(Language::new(2, "en", "English")).unwrap();
        languages.upsert(Language::new(3, "ja", "Japanese")).unwrap();
        let bulletins = InMemoryContentType::new("bulletin", languages.clone());
        bulletins.add_item(100).unwrap();
        (languages, bulletins)
    }

    // ==================== Fan-out Tests ====================

    #[tokio::test]
    async fn test_fan_out_to_remaining_active_languages() {
        let (_, bulletins) = setup();

        let report = create_translations(
            &bulletins,
            100,
            &[TranslationInput::new(1, title("A"))],
            &Actor::new("editor"),
        )
        .await
        .expect("create");

        assert_eq!(report.explicit, 1);
        assert_eq!(report.derived, 2);
        assert_eq!(report.base_language_id, 1);

        let records = bulletins.get_translations(100).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(!records[0].is_synced);
        for record in &records[1..] {
            assert!(record.is_synced);
            assert_eq!(record.fields, title("A"));
        }
    }

    #[tokio::test]
    async fn test_configured_base_is_fan_out_source() {
        let (_, bulletins) = setup();

        let report = create_translations(
            &bulletins,
            100,
            &[
                TranslationInput::new(2, title("english")),
                TranslationInput::new(1, title("korean")),
            ],
            &Actor::new("editor"),
        )
        .await
        .expect("create");

        assert_eq!(report.base_language_id, 1);
        let japanese = bulletins.translation(100, 3).unwrap().unwrap();
        assert_eq!(japanese.fields, title("korean"));
    }

    #[tokio::test]
    async fn test_first_input_is_source_without_base() {
        let (_, bulletins) = setup();

        let report = create_translations(
            &bulletins,
            100,
            &[
                TranslationInput::new(3, title("japanese")),
                TranslationInput::new(2, title("english")),
            ],
            &Actor::new("editor"),
        )
        .await
        .expect("create");

        assert_eq!(report.base_language_id, 3);
        let korean = bulletins.translation(100, 1).unwrap().unwrap();
        assert!(korean.is_synced);
        assert_eq!(korean.fields, title("japanese"));
    }

    #[tokio::test]
    async fn test_inactive_languages_are_not_fanned_out() {
        let (languages, bulletins) = setup();
        languages.set_active("ja", false).unwrap();

        let report = create_translations(
            &bulletins,
            100,
            &[TranslationInput::new(1, title("A"))],
            &Actor::new("editor"),
        )
        .await
        .expect("create");

        assert_eq!(report.derived, 1);
        assert!(bulletins.translation(100, 3).unwrap().is_none());
    }

    // ==================== Validation Tests ====================

    #[tokio::test]
    async fn test_duplicate_language_rejected_before_write() {
        let (_, bulletins) = setup();

        let result = create_translations(
            &bulletins,
            100,
            &[
                TranslationInput::new(1, title("A")),
                TranslationInput::new(1, title("B")),
            ],
            &Actor::new("editor"),
        )
        .await;

        assert!(matches!(result, Err(SyncError::Validation(_))));
        assert!(bulletins.get_translations(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_language_rejected_before_write() {
        let (_, bulletins) = setup();

        let result = create_translations(
            &bulletins,
            100,
            &[
                TranslationInput::new(1, title("A")),
                TranslationInput::new(99, title("B")),
            ],
            &Actor::new("editor"),
        )
        .await;

        assert!(matches!(result, Err(SyncError::NotFound { .. })));
        assert!(bulletins.get_translations(100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_input_rejected() {
        let (_, bulletins) = setup();
        let result = create_translations(&bulletins, 100, &[], &Actor::new("editor")).await;
        assert!(matches!(result, Err(SyncError::Validation(_))));
    }

    #[tokio::test]
    async fn test_missing_content_item_is_not_found() {
        let (_, bulletins) = setup();
        let result = create_translations(
            &bulletins,
            404,
            &[TranslationInput::new(1, title("A"))],
            &Actor::new("editor"),
        )
        .await;
        assert!(matches!(result, Err(SyncError::NotFound { .. })));
    }

    // ==================== Derived Batch Tests ====================

    #[tokio::test]
    async fn test_derived_batch_failure_keeps_pinned_rows() {
        let (_, bulletins) = setup();
        bulletins.fail_synced_creates(true).unwrap();

        let result = create_translations(
            &bulletins,
            100,
            &[TranslationInput::new(1, title("A"))],
            &Actor::new("editor"),
        )
        .await;

        assert!(matches!(result, Err(SyncError::Storage(_))));
        let korean = bulletins.translation(100, 1).unwrap().unwrap();
        assert!(!korean.is_synced);
        assert!(bulletins.translation(100, 2).unwrap().is_none());
        assert!(bulletins.translation(100, 3).unwrap().is_none());

        bulletins.clear_faults().unwrap();
        let report = Reconciler::new(
            Arc::new(bulletins.clone()),
            Actor::system(),
            Arc::new(SyncMetrics::new()),
        )
        .execute()
        .await;

        assert!(report.is_clean());
        assert_eq!(report.created, 2);
        for language_id in [2, 3] {
            let copy = bulletins.translation(100, language_id).unwrap().unwrap();
            assert!(copy.is_synced);
            assert_eq!(copy.fields, title("A"));
        }
    }

    /// Writes an English copy right after the first insert batch, the way a
    /// reconciliation gap-fill interleaves with a creation in flight.
    struct GapFillBetweenBatches {
        inner: InMemoryContentType,
        filled: AtomicBool,
    }

    #[async_trait]
    impl LanguageDirectory for GapFillBetweenBatches {
        async fn resolve_language(&self, code: &str) -> SyncResult<Option<Language>> {
            self.inner.resolve_language(code).await
        }

        async fn find_language(&self, id: LanguageId) -> SyncResult<Option<Language>> {
            self.inner.find_language(id).await
        }

        async fn list_active_languages(&self) -> SyncResult<Vec<Language>> {
            self.inner.list_active_languages().await
        }

        async fn resolve_base_language(&self) -> SyncResult<Option<Language>> {
            self.inner.resolve_base_language().await
        }
    }

    #[async_trait]
    impl ContentTypeAdapter for GapFillBetweenBatches {
        fn content_type(&self) -> &str {
            self.inner.content_type()
        }

        async fn list_all_content_items(&self) -> SyncResult<Vec<ContentId>> {
            self.inner.list_all_content_items().await
        }

        async fn content_item_exists(&self, content_id: ContentId) -> SyncResult<bool> {
            self.inner.content_item_exists(content_id).await
        }

        async fn get_translations(&self, content_id: ContentId) -> SyncResult<Vec<TranslationRecord>> {
            self.inner.get_translations(content_id).await
        }

        async fn create_translations(
            &self,
            content_id: ContentId,
            records: &[NewTranslation],
            actor: &Actor,
        ) -> SyncResult<()> {
            self.inner.create_translations(content_id, records, actor).await?;
            if !self.filled.swap(true, Ordering::SeqCst) {
                let copy = NewTranslation::synced(2, records[0].fields.clone());
                self.inner
                    .create_translations(content_id, &[copy], &Actor::system())
                    .await?;
            }
            Ok(())
        }

        async fn update_translation(
            &self,
            translation_id: TranslationId,
            fields: &TextFields,
            actor: &Actor,
        ) -> SyncResult<bool> {
            self.inner.update_translation(translation_id, fields, actor).await
        }

        async fn write_translation(
            &self,
            translation_id: TranslationId,
            fields: &TextFields,
            is_synced: bool,
            actor: &Actor,
        ) -> SyncResult<()> {
            self.inner
                .write_translation(translation_id, fields, is_synced, actor)
                .await
        }
    }

    #[tokio::test]
    async fn test_interleaved_gap_fill_is_skipped() {
        let (_, bulletins) = setup();
        let adapter = GapFillBetweenBatches {
            inner: bulletins.clone(),
            filled: AtomicBool::new(false),
        };

        let report = create_translations(
            &adapter,
            100,
            &[TranslationInput::new(1, title("A"))],
            &Actor::new("editor"),
        )
        .await
        .expect("create");

        assert_eq!(report.derived, 1);
        let english = bulletins.translation(100, 2).unwrap().unwrap();
        assert_eq!(english.created_by, "system");
        let japanese = bulletins.translation(100, 3).unwrap().unwrap();
        assert!(japanese.is_synced);
        assert_eq!(japanese.created_by, "editor");
        assert_eq!(bulletins.all_translations().unwrap().len(), 3);
    }
}
