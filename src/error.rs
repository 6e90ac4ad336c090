//! Error taxonomy shared by every translation flow.
//!
//! Synchronous flows (creation, manual edit) return these to the caller.
//! Background flows (propagation, reconciliation, backfill) catch them at
//! item or record granularity and record them in their tallies instead.

use thiserror::Error;

/// Errors produced by adapters and the synchronous translation flows.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed caller input (e.g. a language supplied twice)
    #[error("validation failed: {0}")]
    Validation(String),

    /// A language, content item or translation did not exist at lookup time
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Any storage round-trip failure
    #[error("storage error: {0}")]
    Storage(String),
}

impl SyncError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
