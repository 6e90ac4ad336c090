//! PostgreSQL adapter.
//!
//! Expected schema (tables named by `ContentTypeConfig`):
//!
//! ```sql
//! CREATE TABLE languages (
//!     id BIGSERIAL PRIMARY KEY, code TEXT NOT NULL UNIQUE, name TEXT NOT NULL,
//!     is_active BOOLEAN NOT NULL DEFAULT true, deleted_at TIMESTAMPTZ
//! );
//! CREATE TABLE bulletin_translations (
//!     id BIGSERIAL PRIMARY KEY,
//!     bulletin_id BIGINT NOT NULL REFERENCES bulletins (id) ON DELETE CASCADE,
//!     language_id BIGINT NOT NULL REFERENCES languages (id),
//!     title TEXT, content TEXT,
//!     is_synced BOOLEAN NOT NULL DEFAULT false,
//!     created_by TEXT NOT NULL, updated_by TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
//!     UNIQUE (bulletin_id, language_id)
//! );
//! ```

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};

use super::{ContentTypeAdapter, LanguageDirectory};
use crate::content_types::ContentTypeConfig;
use crate::db::Database;
use crate::error::{SyncError, SyncResult};
use crate::i18n::Language;
use crate::translation::{
    Actor, ContentId, LanguageId, NewTranslation, TextFields, TranslationId, TranslationRecord,
};

const LANGUAGE_COLUMNS: &str = "id, code, name, is_active, deleted_at";

fn language_from_row(row: &PgRow) -> Result<Language, sqlx::Error> {
    Ok(Language {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        is_active: row.try_get("is_active")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// The shared `languages` table
#[derive(Clone)]
pub struct PgLanguages {
    db: Database,
    base_code: String,
}

impl PgLanguages {
    pub fn new(db: Database, base_code: impl Into<String>) -> Self {
        Self {
            db,
            base_code: base_code.into(),
        }
    }
}

#[async_trait]
impl LanguageDirectory for PgLanguages {
    async fn resolve_language(&self, code: &str) -> SyncResult<Option<Language>> {
        let sql = format!(
            "SELECT {} FROM languages WHERE code = $1 AND deleted_at IS NULL",
            LANGUAGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(language_from_row).transpose()?)
    }

    async fn find_language(&self, id: LanguageId) -> SyncResult<Option<Language>> {
        let sql = format!(
            "SELECT {} FROM languages WHERE id = $1 AND deleted_at IS NULL",
            LANGUAGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(language_from_row).transpose()?)
    }

    async fn list_active_languages(&self) -> SyncResult<Vec<Language>> {
        let sql = format!(
            "SELECT {} FROM languages WHERE is_active = true AND deleted_at IS NULL ORDER BY id",
            LANGUAGE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(self.db.pool()).await?;
        Ok(rows
            .iter()
            .map(language_from_row)
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn resolve_base_language(&self) -> SyncResult<Option<Language>> {
        let sql = format!(
            "SELECT {} FROM languages WHERE code = $1 AND is_active = true AND deleted_at IS NULL",
            LANGUAGE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&self.base_code)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(language_from_row).transpose()?)
    }
}

/// SQL text for one content type, built once from validated identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
struct Statements {
    list_items: String,
    item_exists: String,
    select_translations: String,
    insert_prefix: String,
    sync_update: String,
    editorial_update: String,
}

impl Statements {
    fn new(config: &ContentTypeConfig) -> Self {
        let fields = &config.text_fields;
        let n = fields.len();
        let field_list = fields.join(", ");
        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ${}", f, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        Self {
            list_items: format!(
                "SELECT id FROM {} WHERE deleted_at IS NULL ORDER BY id",
                config.item_table
            ),
            item_exists: format!(
                "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND deleted_at IS NULL)",
                config.item_table
            ),
            select_translations: format!(
                "SELECT id, {fk} AS content_id, language_id, {fields}, is_synced, \
                 created_by, updated_by, created_at, updated_at \
                 FROM {table} WHERE {fk} = $1 ORDER BY language_id",
                fk = config.foreign_key,
                fields = field_list,
                table = config.translation_table,
            ),
            insert_prefix: format!(
                "INSERT INTO {} ({}, language_id, {}, is_synced, created_by, updated_by) ",
                config.translation_table, config.foreign_key, field_list
            ),
            sync_update: format!(
                "UPDATE {} SET {}, updated_by = ${}, updated_at = now() \
                 WHERE id = ${} AND is_synced = true",
                config.translation_table,
                assignments,
                n + 1,
                n + 2
            ),
            editorial_update: format!(
                "UPDATE {} SET {}, is_synced = ${}, updated_by = ${}, updated_at = now() \
                 WHERE id = ${}",
                config.translation_table,
                assignments,
                n + 1,
                n + 2,
                n + 3
            ),
        }
    }
}

/// One content type's translation table
pub struct PgContentType {
    db: Database,
    languages: PgLanguages,
    config: ContentTypeConfig,
    statements: Statements,
}

impl PgContentType {
    pub fn new(db: Database, languages: PgLanguages, config: ContentTypeConfig) -> Result<Self> {
        config.validate()?;
        let statements = Statements::new(&config);
        Ok(Self {
            db,
            languages,
            config,
            statements,
        })
    }

    fn record_from_row(&self, row: &PgRow) -> Result<TranslationRecord, sqlx::Error> {
        let mut fields = TextFields::new();
        for name in &self.config.text_fields {
            if let Some(value) = row.try_get::<Option<String>, _>(name.as_str())? {
                fields.insert(name.as_str(), value);
            }
        }

        Ok(TranslationRecord {
            id: row.try_get("id")?,
            content_id: row.try_get("content_id")?,
            language_id: row.try_get("language_id")?,
            fields,
            is_synced: row.try_get("is_synced")?,
            created_by: row.try_get("created_by")?,
            updated_by: row.try_get("updated_by")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

}

/// Field values in column order; absent fields bind as NULL.
///
/// A field with no column is rejected so text is never dropped on write.
fn field_values(config: &ContentTypeConfig, fields: &TextFields) -> SyncResult<Vec<Option<String>>> {
    if let Some((unknown, _)) = fields
        .iter()
        .find(|(name, _)| !config.text_fields.iter().any(|column| column == name))
    {
        return Err(SyncError::Validation(format!(
            "{} has no text field '{}'",
            config.name, unknown
        )));
    }

    Ok(config
        .text_fields
        .iter()
        .map(|name| fields.get(name).map(str::to_owned))
        .collect())
}

#[async_trait]
impl LanguageDirectory for PgContentType {
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
impl ContentTypeAdapter for PgContentType {
    fn content_type(&self) -> &str {
        &self.config.name
    }

    async fn list_all_content_items(&self) -> SyncResult<Vec<ContentId>> {
        let rows = sqlx::query(&self.statements.list_items)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get::<i64, _>("id"))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn content_item_exists(&self, content_id: ContentId) -> SyncResult<bool> {
        let row = sqlx::query(&self.statements.item_exists)
            .bind(content_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn get_translations(&self, content_id: ContentId) -> SyncResult<Vec<TranslationRecord>> {
        let rows = sqlx::query(&self.statements.select_translations)
            .bind(content_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(rows
            .iter()
            .map(|row| self.record_from_row(row))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn create_translations(
        &self,
        content_id: ContentId,
        records: &[NewTranslation],
        actor: &Actor,
    ) -> SyncResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let values = records
            .iter()
            .map(|record| field_values(&self.config, &record.fields))
            .collect::<SyncResult<Vec<_>>>()?;

        // A single multi-row INSERT is atomic, so the batch lands whole or not at all
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(self.statements.insert_prefix.as_str());
        builder.push_values(records.iter().zip(values), |mut row, (record, values)| {
            row.push_bind(content_id).push_bind(record.language_id);
            for value in values {
                row.push_bind(value);
            }
            row.push_bind(record.is_synced)
                .push_bind(actor.as_str().to_owned())
                .push_bind(actor.as_str().to_owned());
        });

        builder.build().execute(self.db.pool()).await?;
        Ok(())
    }

    async fn update_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        actor: &Actor,
    ) -> SyncResult<bool> {
        let mut query = sqlx::query(&self.statements.sync_update);
        for value in field_values(&self.config, fields)? {
            query = query.bind(value);
        }
        let result = query
            .bind(actor.as_str())
            .bind(translation_id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn write_translation(
        &self,
        translation_id: TranslationId,
        fields: &TextFields,
        is_synced: bool,
        actor: &Actor,
    ) -> SyncResult<()> {
        let mut query = sqlx::query(&self.statements.editorial_update);
        for value in field_values(&self.config, fields)? {
            query = query.bind(value);
        }
        let result = query
            .bind(is_synced)
            .bind(actor.as_str())
            .bind(translation_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(SyncError::not_found("translation", translation_id));
        }
        Ok(())
    }
}
