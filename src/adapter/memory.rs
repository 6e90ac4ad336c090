//! In-process adapter backed by plain collections.
//!
//! Used by the test suites and for local experiments. Enforces the same
//! constraints as the PostgreSQL schema (one row per content/language,
//! all-or-nothing batch inserts, conditional sync writes) and can be told
//! to fail specific operations to exercise error paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{ContentTypeAdapter, LanguageDirectory};
use crate::error::{SyncError, SyncResult};
use crate::i18n::Language;
use crate::translation::{
    Actor, ContentId, LanguageId, NewTranslation, TextFields, TranslationId, TranslationRecord,
};

fn lock<T>(mutex: &Mutex<T>) -> SyncResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| SyncError::storage("in-memory store lock poisoned"))
}

struct LanguageState {
    languages: Vec<Language>,
    base_code: String,
}

/// Shared language table. Clones share state.
#[derive(Clone)]
pub struct InMemoryLanguages {
    state: Arc<Mutex<LanguageState>>,
}

impl InMemoryLanguages {
    pub fn new(base_code: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(LanguageState {
                languages: Vec::new(),
                base_code: base_code.into(),
            })),
        }
    }

    /// Insert or replace a language (matched by id)
    pub fn upsert(&self, language: Language) -> SyncResult<()> {
        let mut state = lock(&self.state)?;
        state.languages.retain(|l| l.id != language.id);
        state.languages.push(language);
        state.languages.sort_by_key(|l| l.id);
        Ok(())
    }

    /// Flip a language's active flag; returns false if the code is unknown
    pub fn set_active(&self, code: &str, active: bool) -> SyncResult<bool> {
        let mut state = lock(&self.state)?;
        match state.languages.iter_mut().find(|l| l.code == code) {
            Some(language) => {
                language.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn set_base_code(&self, code: impl Into<String>) -> SyncResult<()> {
        lock(&self.state)?.base_code = code.into();
        Ok(())
    }
}

#[async_trait]
impl LanguageDirectory for InMemoryLanguages {
    async fn resolve_language(&self, code: &str) -> SyncResult<Option<Language>> {
        let state = lock(&self.state)?;
        Ok(state
            .languages
            .iter()
            .find(|l| l.code == code && !l.is_deleted())
            .cloned())
    }

    async fn find_language(&self, id: LanguageId) -> SyncResult<Option<Language>> {
        let state = lock(&self.state)?;
        Ok(state
            .languages
            .iter()
            .find(|l| l.id == id && !l.is_deleted())
            .cloned())
    }

    async fn list_active_languages(&self) -> SyncResult<Vec<Language>> {
        let state = lock(&self.state)?;
        Ok(state
            .languages
            .iter()
            .filter(|l| l.is_available())
            .cloned()
            .collect())
    }

    async fn resolve_base_language(&self) -> SyncResult<Option<Language>> {
        let state = lock(&self.state)?;
        Ok(state
            .languages
            .iter()
            .find(|l| l.code == state.base_code && l.is_available())
            .cloned())
    }
}

#[derive(Default)]
struct Faults {
    listing: bool,
    synced_creates: bool,
    updates_for: HashSet<LanguageId>,
}

#[derive(Default)]
struct ContentState {
    /// content id -> soft-deleted flag
    items: BTreeMap<ContentId, bool>,
    translations: Vec<TranslationRecord>,
    next_id: TranslationId,
    faults: Faults,
}

/// One content type held in memory.
#[derive(Clone)]
pub struct InMemoryContentType {
    name: String,
    languages: InMemoryLanguages,
    state: Arc<Mutex<ContentState>>,
}

impl InMemoryContentType {
    pub fn new(name: impl Into<String>, languages: InMemoryLanguages) -> Self {
        Self {
            name: name.into(),
            languages,
            state: Arc::new(Mutex::new(ContentState {
                next_id: 1,
                ..ContentState::default()
            })),
        }
    }

    pub fn add_item(&self, content_id: ContentId) -> SyncResult<()> {
        lock(&self.state)?.items.insert(content_id, false);
        Ok(())
    }

    pub fn soft_delete_item(&self, content_id: ContentId) -> SyncResult<()> {
        if let Some(deleted) = lock(&self.state)?.items.get_mut(&content_id) {
            *deleted = true;
        }
        Ok(())
    }

    /// Hard delete, cascading to the item's translations
    pub fn delete_item(&self, content_id: ContentId) -> SyncResult<()> {
        let mut state = lock(&self.state)?;
        state.items.remove(&content_id);
        state.translations.retain(|t| t.content_id != content_id);
        Ok(())
    }

    /// Snapshot of one translation, bypassing fault injection
    pub fn translation(
        &self,
        content_id: ContentId,
        language_id: LanguageId,
    ) -> SyncResult<Option<TranslationRecord>> {
        let state = lock(&self.state)?;
        Ok(state
            .translations
            .iter()
            .find(|t| t.content_id == content_id && t.language_id == language_id)
            .cloned())
    }

    /// Snapshot of every stored translation across all items
    pub fn all_translations(&self) -> SyncResult<Vec<TranslationRecord>> {
        Ok(lock(&self.state)?.translations.clone())
    }

    pub fn fail_listing(&self, fail: bool) -> SyncResult<()> {
        lock(&self.state)?.faults.listing = fail;
        Ok(())
    }

    /// Make insert batches that contain auto-synced rows fail; pinned-only batches still land
    pub fn fail_synced_creates(&self, fail: bool) -> SyncResult<()> {
        lock(&self.state)?.faults.synced_creates = fail;
        Ok(())
    }

    /// Make sync writes to rows in `language_id` fail
    pub fn fail_updates_for(&self, language_id: LanguageId) -> SyncResult<()> {
        lock(&self.state)?.faults.updates_for.insert(language_id);
        Ok(())
    }

    pub fn clear_faults(&self) -> SyncResult<()> {
        lock(&self.state)?.faults = Faults::default();
        Ok(())
    }
}

#[async_trait]
impl LanguageDirectory for InMemoryContentType {
    async fn resolve_language(&self, code: &str) -> SyncResult<Option<Language>> {
        self.languages.resolve_language(code).await
    }

    async fn find_language(&self, id: LanguageId) -> SyncResult<Option<Language>> {
        self.languages.find_language(id).await
    }

    async fn list_active_languages(&self) -> SyncResult<Vec<Language>> {
        self.languages.list_active_languages().await
    }

    async fn resolve_base_language(&self) -> SyncResult<Option<Language>> {
        self.languages.resolve_base_language().await
    }
}

#[async_trait]
impl ContentTypeAdapter for InMemoryContentType {
    fn content_type(&self) -> &str {
        &self.name
    }

    async fn list_all_content_items(&self) -> SyncResult<Vec<ContentId>> {
        let state = lock(&self.state)?;
        if state.faults.listing {
            return Err(SyncError::storage(format!(
                "{}: simulated listing failure",
                self.name
            )));
        }
        Ok(state
            .items
            .iter()
            .filter(|(_, deleted)| !**deleted)
            .map(|(id, _)| *id)
            .collect())
    }

    async fn content_item_exists(&self, content_id: ContentId) -> SyncResult<bool> {
        let state = lock(&self.state)?;
        Ok(matches!(state.items.get(&content_id), Some(false)))
    }

    async fn get_translations(&self, content_id: ContentId) -> SyncResult<Vec<TranslationRecord>> {
        let state = lock(&self.state)?;
        let mut records: Vec<_> = state
            .translations
            .iter()
            .filter(|t| t.content_id == content_id)
            .cloned()
            .collect();
        records.sort_by_key(|t| t.language_id);
        Ok(records)
    }

    async fn create_translations(
        &self,
        content_id: ContentId,
        records: &[NewTranslation],
        actor: &Actor,
    ) -> SyncResult<()> {
        let mut state = lock(&self.state)?;
        if state.faults.synced_creates && records.iter().any(|r| r.is_synced) {
            return Err(SyncError::storage(format!(
                "{}: simulated insert failure",
                self.name
            )));
        }
        if !state.items.contains_key(&content_id) {
            return Err(SyncError::not_found("content item", content_id));
        }

        // Unique (content_id, language_id), checked for the whole batch first
        let mut taken: HashSet<LanguageId> = state
            .translations
            .iter()
            .filter(|t| t.content_id == content_id)
            .map(|t| t.language_id)
            .collect();
        for record in records {
            if !taken.insert(record.language_id) {
                return Err(SyncError::storage(format!(
                    "duplicate translation for content {} language {}",
                    content_id, record.language_id
                )));
            }
        }

        let now = Utc::now();
        for record in records {
            let id = state.next_id;
            state.next_id += 1;
            state.translations.push(TranslationRecord {
                id,
                content_id,
                language_id: record.language_id,
                fields: record.fields.clone(),
                is_synced: record.is_synced,
                created_by: actor.to_string(),
                updated_by: actor.to_string(),
                created_at: now,
                updated_at: now,
            });
        }
        Ok(())
    }

    async fn update_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        actor: &Actor,
    ) -> SyncResult<bool> {
        let mut state = lock(&self.state)?;
        let ContentState {
            translations,
            faults,
            ..
        } = &mut *state;

        let record = translations
            .iter_mut()
            .find(|t| t.id == translation_id)
            .ok_or_else(|| SyncError::not_found("translation", translation_id))?;

        if faults.updates_for.contains(&record.language_id) {
            return Err(SyncError::storage(format!(
                "simulated write failure for translation {}",
                translation_id
            )));
        }
        if !record.is_synced {
            return Ok(false);
        }

        record.fields = fields.clone();
        record.updated_by = actor.to_string();
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn write_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        is_synced: bool,
        actor: &Actor,
    ) -> SyncResult<()> {
        let mut state = lock(&self.state)?;
        let record = state
            .translations
            .iter_mut()
            .find(|t| t.id == translation_id)
            .ok_or_else(|| SyncError::not_found("translation", translation_id))?;

        record.fields = fields.clone();
        record.is_synced = is_synced;
        record.updated_by = actor.to_string();
        record.updated_at = Utc::now();
        Ok(())
    }
}
