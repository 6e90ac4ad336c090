//! Internationalization (i18n) module: languages and base-language rules.
//!
//! # Architecture
//!
//! - `language`: the `Language` row shared by every content type
//! - `base`: base-translation selection and fan-out set arithmetic
//!
//! # Example
//!
//! ```rust,ignore
//! use crate::i18n::{select_base_translation, remaining_languages};
//!
//! let (base, _) = select_base_translation(&inputs, configured_base.as_ref())?;
//! let targets = remaining_languages(&active, &provided);
//! ```

mod base;
mod language;

pub use base::{find_duplicate_language, remaining_languages, select_base_translation, BaseSelection};
pub use language::Language;
