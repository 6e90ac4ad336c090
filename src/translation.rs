//! Translation records and the text they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ContentId = i64;
pub type LanguageId = i64;
pub type TranslationId = i64;

/// Named text fields of one translation (e.g. `title`, `description`).
///
/// The set of names is content-type specific. A missing name means the
/// field is empty (NULL in storage).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TextFields(BTreeMap<String, String>);

impl TextFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for tests and fixtures
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TextFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Who performed a write. Background flows write as the system actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn system() -> Self {
        Self("system".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted translation row, unique per (content_id, language_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRecord {
    pub id: TranslationId,
    pub content_id: ContentId,
    pub language_id: LanguageId,
    pub fields: TextFields,
    /// true = auto-maintained copy of the base text, false = pinned
    pub is_synced: bool,
    pub created_by: String,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row to insert through `ContentTypeAdapter::create_translations`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTranslation {
    pub language_id: LanguageId,
    pub fields: TextFields,
    pub is_synced: bool,
}

impl NewTranslation {
    pub fn pinned(language_id: LanguageId, fields: TextFields) -> Self {
        Self {
            language_id,
            fields,
            is_synced: false,
        }
    }

    pub fn synced(language_id: LanguageId, fields: TextFields) -> Self {
        Self {
            language_id,
            fields,
            is_synced: true,
        }
    }
}

/// Caller-supplied text for one language at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslationInput {
    pub language_id: LanguageId,
    pub fields: TextFields,
}

impl TranslationInput {
    pub fn new(language_id: LanguageId, fields: TextFields) -> Self {
        Self {
            language_id,
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_fields_builder() {
        let fields = TextFields::new().with("title", "A").with("description", "B");
        assert_eq!(fields.get("title"), Some("A"));
        assert_eq!(fields.get("description"), Some("B"));
        assert_eq!(fields.get("missing"), None);
    }

    #[test]
    fn test_text_fields_equality_ignores_insert_order() {
        let a = TextFields::new().with("title", "A").with("body", "B");
        let b = TextFields::new().with("body", "B").with("title", "A");
        assert_eq!(a, b);
    }

    #[test]
    fn test_text_fields_serializes_as_plain_map() {
        let fields = TextFields::new().with("title", "안녕");
        let json = serde_json::to_string(&fields).expect("serialize");
        assert_eq!(json, r#"{"title":"안녕"}"#);
    }

    #[test]
    fn test_new_translation_constructors() {
        let fields = TextFields::new().with("title", "A");
        assert!(!NewTranslation::pinned(1, fields.clone()).is_synced);
        assert!(NewTranslation::synced(2, fields).is_synced);
    }

    #[test]
    fn test_system_actor() {
        assert_eq!(Actor::system().as_str(), "system");
        assert_eq!(Actor::new("editor-7").to_string(), "editor-7");
    }
}
