//! Content-type definitions: which tables hold each type's translations.
//!
//! The built-in set mirrors the content backend's tables. A JSON file named by
//! `CONTENT_TYPES_FILE` replaces it entirely. Identifiers are spliced into SQL,
//! so every one is validated before use.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Columns the engine manages itself; text fields must not reuse them
const RESERVED_COLUMNS: &[&str] = &[
    "id",
    "language_id",
    "is_synced",
    "created_by",
    "updated_by",
    "created_at",
    "updated_at",
];

static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

fn identifier_regex() -> &'static Regex {
    IDENTIFIER_REGEX.get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").expect("valid regex"))
}

/// Whether `name` is safe to use as an unquoted SQL identifier
pub fn is_valid_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// Storage layout of one content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeConfig {
    /// Name used for routing and reporting (e.g. "bulletin")
    pub name: String,

    /// Table of content items; must have `id` and `deleted_at`
    pub item_table: String,

    /// Table of translations for this type
    pub translation_table: String,

    /// Column in `translation_table` referencing `item_table.id`
    pub foreign_key: String,

    /// Text columns copied from the base translation
    pub text_fields: Vec<String>,

    /// Overrides the default reconciliation cadence
    #[serde(default)]
    pub reconcile_interval_minutes: Option<u32>,
}

impl ContentTypeConfig {
    fn new(
        name: &str,
        item_table: &str,
        translation_table: &str,
        foreign_key: &str,
        text_fields: &[&str],
    ) -> Self {
        Self {
            name: name.to_string(),
            item_table: item_table.to_string(),
            translation_table: translation_table.to_string(),
            foreign_key: foreign_key.to_string(),
            text_fields: text_fields.iter().map(|f| f.to_string()).collect(),
            reconcile_interval_minutes: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("Content type name must not be empty");
        }

        for (what, ident) in [
            ("item_table", &self.item_table),
            ("translation_table", &self.translation_table),
            ("foreign_key", &self.foreign_key),
        ] {
            if !is_valid_identifier(ident) {
                bail!("{}: invalid {} '{}'", self.name, what, ident);
            }
        }

        if self.text_fields.is_empty() {
            bail!("{}: at least one text field is required", self.name);
        }

        let mut seen = HashSet::new();
        for field in &self.text_fields {
            if !is_valid_identifier(field) {
                bail!("{}: invalid text field '{}'", self.name, field);
            }
            if RESERVED_COLUMNS.contains(&field.as_str()) || *field == self.foreign_key {
                bail!("{}: text field '{}' clashes with a managed column", self.name, field);
            }
            if !seen.insert(field) {
                bail!("{}: text field '{}' listed twice", self.name, field);
            }
        }

        Ok(())
    }
}

/// Built-in content types of the content backend.
pub fn default_content_types() -> Vec<ContentTypeConfig> {
    vec![
        ContentTypeConfig::new(
            "bulletin",
            "bulletins",
            "bulletin_translations",
            "bulletin_id",
            &["title", "content"],
        ),
        ContentTypeConfig::new(
            "ir",
            "ir_documents",
            "ir_document_translations",
            "ir_document_id",
            &["title", "description"],
        ),
        ContentTypeConfig::new(
            "electronic_disclosure",
            "electronic_disclosures",
            "electronic_disclosure_translations",
            "electronic_disclosure_id",
            &["title", "description"],
        ),
        ContentTypeConfig::new(
            "brochure",
            "brochures",
            "brochure_translations",
            "brochure_id",
            &["title", "description"],
        ),
        ContentTypeConfig::new(
            "popup",
            "popups",
            "popup_translations",
            "popup_id",
            &["title", "content"],
        ),
        ContentTypeConfig::new(
            "story",
            "stories",
            "story_translations",
            "story_id",
            &["title", "summary", "content"],
        ),
        ContentTypeConfig::new(
            "meeting_record",
            "meeting_records",
            "meeting_record_translations",
            "meeting_record_id",
            &["title", "agenda", "content"],
        ),
    ]
}

/// Load content types from a JSON file, or the built-in set when `path` is None.
pub fn load_content_types(path: Option<&str>) -> Result<Vec<ContentTypeConfig>> {
    let content_types = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read content types file {}", path))?;
            serde_json::from_str::<Vec<ContentTypeConfig>>(&raw)
                .with_context(|| format!("Failed to parse content types file {}", path))?
        }
        None => default_content_types(),
    };

    let mut names = HashSet::new();
    for content_type in &content_types {
        content_type.validate()?;
        if !names.insert(content_type.name.as_str()) {
            bail!("Content type '{}' defined twice", content_type.name);
        }
    }

    Ok(content_types)
}
