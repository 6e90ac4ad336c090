//! Base-language selection and fan-out set arithmetic.
//!
//! The base translation is the source every auto-synced copy is derived
//! from. At creation time it is the caller entry in the configured base
//! language, falling back to the first caller entry in input order.

use std::collections::HashSet;

use crate::i18n::Language;
use crate::translation::{LanguageId, TranslationInput};

/// Which rule picked the base translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseSelection {
    /// Caller supplied text in the configured base language
    Configured,
    /// Configured base absent from the input (or unresolvable); first entry used
    FirstProvided,
}

/// Return the first language id that appears more than once in the input.
pub fn find_duplicate_language(inputs: &[TranslationInput]) -> Option<LanguageId> {
    let mut seen = HashSet::with_capacity(inputs.len());
    inputs
        .iter()
        .map(|input| input.language_id)
        .find(|id| !seen.insert(*id))
}

/// Pick the base translation among caller-provided entries.
///
/// Returns `None` only for empty input.
pub fn select_base_translation<'a>(
    inputs: &'a [TranslationInput],
    configured_base: Option<&Language>,
) -> Option<(&'a TranslationInput, BaseSelection)> {
    if let Some(base) = configured_base {
        if let Some(input) = inputs.iter().find(|i| i.language_id == base.id) {
            return Some((input, BaseSelection::Configured));
        }
    }
    inputs.first().map(|i| (i, BaseSelection::FirstProvided))
}

/// Active languages with no entry in `provided`, preserving `active` order.
pub fn remaining_languages<'a>(
    active: &'a [Language],
    provided: &HashSet<LanguageId>,
) -> Vec<&'a Language> {
    active
        .iter()
        .filter(|lang| lang.is_available() && !provided.contains(&lang.id))
        .collect()
}
