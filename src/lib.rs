//! Translation synchronization engine.
//!
//! Keeps every language's copy of a content item consistent with its
//! base-language translation: fan-out on creation, event-driven propagation
//! of base edits, periodic reconciliation, and backfill when a language is
//! activated. Records an editor has pinned are never overwritten.

pub mod adapter;
pub mod backfill;
pub mod config;
pub mod content_types;
pub mod creation;
pub mod db;
pub mod edit;
pub mod engine;
pub mod error;
pub mod events;
pub mod i18n;
pub mod metrics;
pub mod propagation;
pub mod reconcile;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod sync;
pub mod translation;

pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
