//! Persistent storage for release rows.

mod query;
mod schema;
mod sqlite_release_store;

pub use query::{
    GenreCount, ReleasePage, ReleaseQuery, ReleaseStats, SortOrder, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use schema::RELEASE_VERSIONED_SCHEMAS;
pub use sqlite_release_store::SqliteReleaseStore;

use crate::merge::FillOnlyUpdate;
use crate::release::{CandidateRecord, ReleaseIdentity, ReleaseRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A write broke a table constraint other than the dedup identity.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Release {0} not found")]
    NotFound(i64),

    #[error("Malformed stored row: {0}")]
    Malformed(String),

    /// The database cannot be reached or is in an unusable state.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// True when no further write in this run can be expected to succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Constraint(message.clone().unwrap_or_else(|| err.to_string()))
            }
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..) => StoreError::Malformed(err.to_string()),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Outcome of a conditional insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(ReleaseRecord),
    /// Another writer already holds this dedup identity.
    IdentityConflict,
}

pub trait ReleaseStore: Send + Sync {
    fn find_by_identity(
        &self,
        identity: &ReleaseIdentity,
    ) -> Result<Option<ReleaseRecord>, StoreError>;

    /// Inserts `candidate` unless its identity already exists. Never overwrites.
    fn insert(&self, candidate: &CandidateRecord) -> Result<InsertOutcome, StoreError>;

    /// Applies `update` to row `id` in one statement and returns the row after the write.
    /// `updated_at` is refreshed even when `update` is empty.
    fn update_fill_only(
        &self,
        id: i64,
        update: &FillOnlyUpdate,
    ) -> Result<ReleaseRecord, StoreError>;

    /// Reddit rows missing artwork, price or label, most popular first.
    fn releases_needing_enrichment(&self, limit: usize) -> Result<Vec<ReleaseRecord>, StoreError>;

    fn query_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, StoreError>;

    fn count_releases(&self, query: &ReleaseQuery) -> Result<usize, StoreError>;

    fn release_stats(&self) -> Result<ReleaseStats, StoreError>;
}
