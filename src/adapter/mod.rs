//! The operations a content type exposes to the sync engine.
//!
//! Every flow in this crate is written once against these traits and
//! instantiated per content type through the registry.

mod memory;
mod postgres;

pub use memory::{InMemoryContentType, InMemoryLanguages};
pub use postgres::{PgContentType, PgLanguages};

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::i18n::Language;
use crate::translation::{
    Actor, ContentId, LanguageId, NewTranslation, TextFields, TranslationId, TranslationRecord,
};

/// Language lookups shared by all content types.
#[async_trait]
pub trait LanguageDirectory: Send + Sync {
    /// Look up a language by code. Soft-deleted languages are absent.
    async fn resolve_language(&self, code: &str) -> SyncResult<Option<Language>>;

    /// Look up a language by id. Soft-deleted languages are absent.
    async fn find_language(&self, id: LanguageId) -> SyncResult<Option<Language>>;

    async fn list_active_languages(&self) -> SyncResult<Vec<Language>>;

    /// The configured base language, if it exists and is active.
    async fn resolve_base_language(&self) -> SyncResult<Option<Language>>;
}

/// Storage operations for one content type's translation table.
#[async_trait]
pub trait ContentTypeAdapter: LanguageDirectory {
    /// Stable name used for routing, logging and reporting
    fn content_type(&self) -> &str;

    /// All content items that are not soft-deleted
    async fn list_all_content_items(&self) -> SyncResult<Vec<ContentId>>;

    async fn content_item_exists(&self, content_id: ContentId) -> SyncResult<bool>;

    /// Every translation of an item, ordered by language id
    async fn get_translations(&self, content_id: ContentId) -> SyncResult<Vec<TranslationRecord>>;

    /// Batched insert; either every record is written or none is
    async fn create_translations(
        &self,
        content_id: ContentId,
        records: &[NewTranslation],
        actor: &Actor,
    ) -> SyncResult<()>;

    /// Sync write. Overwrites text fields only while the row is still
    /// `is_synced`; returns whether the row was written.
    async fn update_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        actor: &Actor,
    ) -> SyncResult<bool>;

    /// Editorial write: text fields and the sync flag together.
    async fn write_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        is_synced: bool,
        actor: &Actor,
    ) -> SyncResult<()>;
}

