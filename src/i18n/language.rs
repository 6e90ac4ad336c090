//! Language type: a row of the shared `languages` table.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::translation::LanguageId;

/// A language known to the content backend.
///
/// Only active, non-deleted languages take part in fan-out and backfill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language {
    pub id: LanguageId,

    /// Unique language code (e.g. "ko", "en", "ja")
    pub code: String,

    /// Display name (e.g. "Korean")
    pub name: String,

    /// Whether operators have switched this language on
    pub is_active: bool,

    /// Set when the language has been soft-deleted
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Language {
    pub fn new(id: LanguageId, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            is_active: true,
            deleted_at: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether this language participates in fan-out, backfill and base resolution
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_deleted()
    }
}
