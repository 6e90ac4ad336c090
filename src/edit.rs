//! Manual edits from the editorial surface.
//!
//! An edit always pins the record (`is_synced = false`). Editing the base
//! translation additionally publishes `BaseTranslationUpdated` so the
//! auto-synced copies follow; the publish is one-way and cannot fail the edit.

use serde::Serialize;
use tracing::info;

use crate::adapter::ContentTypeAdapter;
use crate::error::{SyncError, SyncResult};
use crate::events::{BaseTranslationUpdated, EventDispatcher};
use crate::translation::{Actor, ContentId, LanguageId, TextFields, TranslationId, TranslationRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditReport {
    pub translation_id: TranslationId,
    /// Whether the edit hit the base translation and an event went out
    pub published: bool,
}

async fn load_record(
    adapter: &dyn ContentTypeAdapter,
    content_id: ContentId,
    language_id: LanguageId,
) -> SyncResult<(Vec<TranslationRecord>, TranslationRecord)> {
    if !adapter.content_item_exists(content_id).await? {
        return Err(SyncError::not_found("content item", content_id));
    }

    let records = adapter.get_translations(content_id).await?;
    let record = records
        .iter()
        .find(|r| r.language_id == language_id)
        .cloned()
        .ok_or_else(|| {
            SyncError::not_found("translation", format!("{}/{}", content_id, language_id))
        })?;

    Ok((records, record))
}

/// Overwrite one translation with editor-supplied text and pin it.
pub async fn edit_translation(
    adapter: &dyn ContentTypeAdapter,
    dispatcher: &EventDispatcher,
    content_id: ContentId,
    language_id: LanguageId,
    fields: &TextFields,
    actor: &Actor,
) -> SyncResult<EditReport> {
    if fields.is_empty() {
        return Err(SyncError::Validation("no fields to write".to_string()));
    }

    let (_, record) = load_record(adapter, content_id, language_id).await?;
    // Resolved before the write so a lookup failure cannot follow a committed edit
    let base = adapter.resolve_base_language().await?;

    adapter
        .write_translation(record.id, fields, false, actor)
        .await?;

    let published = base.is_some_and(|base| base.id == language_id);
    if published {
        dispatcher.publish(BaseTranslationUpdated {
            content_type: adapter.content_type().to_string(),
            content_id,
            language_id,
            fields: fields.clone(),
            actor: actor.clone(),
        });
    }

    info!(
        content_type = adapter.content_type(),
        content_id,
        language_id,
        actor = %actor,
        published,
        "Translation edited"
    );

    Ok(EditReport {
        translation_id: record.id,
        published,
    })
}

/// Hand a pinned translation back to auto-sync, resetting it to the base text.
pub async fn unpin_translation(
    adapter: &dyn ContentTypeAdapter,
    content_id: ContentId,
    language_id: LanguageId,
    actor: &Actor,
) -> SyncResult<TranslationId> {
    let base = adapter
        .resolve_base_language()
        .await?
        .ok_or_else(|| SyncError::not_found("base language", "configured code"))?;

    if base.id == language_id {
        return Err(SyncError::Validation(
            "the base translation cannot be auto-synced".to_string(),
        ));
    }

    let (records, record) = load_record(adapter, content_id, language_id).await?;
    let base_record = records
        .iter()
        .find(|r| r.language_id == base.id)
        .ok_or_else(|| {
            SyncError::not_found("base translation", format!("{}/{}", content_id, base.id))
        })?;

    adapter
        .write_translation(record.id, &base_record.fields, true, actor)
        .await?;

    info!(
        content_type = adapter.content_type(),
        content_id,
        language_id,
        actor = %actor,
        "Translation returned to auto-sync"
    );

    Ok(record.id)
}
