//! Merge/upsert engine.
//!
//! Decides per candidate whether to insert a new release or fill an existing
//! one. The store's conditional insert and single-statement update carry all
//! of the concurrency control; the engine never holds a lock across calls.

mod fill_only;

pub use fill_only::{FillOnlyUpdate, Popularity};

use crate::release::CandidateRecord;
use crate::release_store::{InsertOutcome, ReleaseStore, StoreError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of upserting one candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Inserted(i64),
    Updated(i64),
    Rejected(String),
}

pub struct UpsertEngine {
    store: Arc<dyn ReleaseStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn ReleaseStore>) -> Self {
        Self { store }
    }

    /// Inserts or fill-only updates the row for `candidate`'s identity.
    ///
    /// Per-record problems come back as [`UpsertOutcome::Rejected`]; only an
    /// unavailable store is returned as an error.
    pub fn upsert(&self, candidate: &CandidateRecord) -> Result<UpsertOutcome, StoreError> {
        if let Err(reason) = validate(candidate) {
            debug!("Rejecting {}/{}: {}", candidate.source, candidate.source_id, reason);
            return Ok(UpsertOutcome::Rejected(reason));
        }

        match self.try_upsert(candidate) {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(
                    "Failed to save {} - {} ({}/{}): {}",
                    candidate.artist, candidate.album, candidate.source, candidate.source_id, e
                );
                Ok(UpsertOutcome::Rejected(e.to_string()))
            }
        }
    }

    fn try_upsert(&self, candidate: &CandidateRecord) -> Result<UpsertOutcome, StoreError> {
        let identity = candidate.identity();
        let update = FillOnlyUpdate::from_candidate(candidate);

        if let Some(existing) = self.store.find_by_identity(&identity)? {
            let updated = self.store.update_fill_only(existing.id, &update)?;
            return Ok(UpsertOutcome::Updated(updated.id));
        }

        match self.store.insert(candidate)? {
            InsertOutcome::Inserted(record) => Ok(UpsertOutcome::Inserted(record.id)),
            InsertOutcome::IdentityConflict => {
                // Lost a race with a concurrent writer; the row exists now.
                let existing = self.store.find_by_identity(&identity)?.ok_or_else(|| {
                    StoreError::Constraint(format!(
                        "identity {}/{} conflicted but no row was found",
                        identity.artist_key, identity.album_key
                    ))
                })?;
                let updated = self.store.update_fill_only(existing.id, &update)?;
                Ok(UpsertOutcome::Updated(updated.id))
            }
        }
    }
}

fn validate(candidate: &CandidateRecord) -> Result<(), String> {
    if candidate.identity().is_blank() {
        return Err("artist or album is empty".to_string());
    }
    if candidate.source_id.trim().is_empty() {
        return Err("source id is empty".to_string());
    }
    if candidate.source_url.trim().is_empty() {
        return Err("source url is empty".to_string());
    }
    if candidate.formats.is_empty() {
        return Err("format list is empty".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::{RedditExtras, ReleaseIdentity, ReleaseRecord, Source};
    use crate::release_store::{ReleasePage, ReleaseQuery, ReleaseStats, SqliteReleaseStore};
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn candidate(artist: &str, album: &str) -> CandidateRecord {
        let mut candidate = CandidateRecord::new(
            artist,
            album,
            Source::Reddit,
            "id1",
            "https://www.reddit.com/r/x/id1",
        );
        candidate.reddit = Some(RedditExtras {
            subreddit: "VinylReleases".to_string(),
            score: 1,
            num_comments: 0,
            author: None,
            flair: None,
            posted_at: None,
        });
        candidate
    }

    fn sqlite_engine() -> (UpsertEngine, Arc<SqliteReleaseStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteReleaseStore::new(temp_dir.path().join("releases.db")).unwrap());
        (UpsertEngine::new(store.clone()), store, temp_dir)
    }

    #[test]
    fn first_upsert_inserts_second_updates() {
        let (engine, _store, _dir) = sqlite_engine();
        let first = engine.upsert(&candidate("Mitski", "Laurel Hell")).unwrap();
        let UpsertOutcome::Inserted(id) = first else {
            panic!("expected insert, got {:?}", first);
        };
        let second = engine.upsert(&candidate("mitski", "LAUREL HELL")).unwrap();
        assert_eq!(second, UpsertOutcome::Updated(id));
    }

    #[test]
    fn blank_identity_is_rejected_without_touching_store() {
        let (engine, store, _dir) = sqlite_engine();
        let outcome = engine.upsert(&candidate("   ", "Album")).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Rejected(_)));

        let mut no_id = candidate("Artist", "Album");
        no_id.source_id = String::new();
        assert!(matches!(engine.upsert(&no_id).unwrap(), UpsertOutcome::Rejected(_)));
        assert_eq!(store.count_releases(&ReleaseQuery::default()).unwrap(), 0);
    }

    #[test]
    fn inferred_formats_never_replace_detected_ones() {
        let (engine, store, _dir) = sqlite_engine();
        let detailed = candidate("Air", "Moon Safari").with_formats(vec!["2LP".to_string()]);
        engine.upsert(&detailed).unwrap();
        engine.upsert(&candidate("Air", "Moon Safari")).unwrap();

        let row = store
            .find_by_identity(&ReleaseIdentity::new("Air", "Moon Safari", Source::Reddit))
            .unwrap()
            .unwrap();
        assert_eq!(row.formats, vec!["2LP"]);
    }

    /// Store double whose first lookup misses and whose insert always conflicts,
    /// as if another writer inserted the row in between.
    struct RacingStore {
        inner: SqliteReleaseStore,
        lookups: Mutex<usize>,
    }

    impl ReleaseStore for RacingStore {
        fn find_by_identity(
            &self,
            identity: &ReleaseIdentity,
        ) -> Result<Option<ReleaseRecord>, StoreError> {
            let mut lookups = self.lookups.lock().unwrap();
            *lookups += 1;
            if *lookups == 1 {
                return Ok(None);
            }
            self.inner.find_by_identity(identity)
        }
        fn insert(&self, candidate: &CandidateRecord) -> Result<InsertOutcome, StoreError> {
            self.inner.insert(candidate)?;
            Ok(InsertOutcome::IdentityConflict)
        }
        fn update_fill_only(
            &self,
            id: i64,
            update: &FillOnlyUpdate,
        ) -> Result<ReleaseRecord, StoreError> {
            self.inner.update_fill_only(id, update)
        }
        fn releases_needing_enrichment(
            &self,
            limit: usize,
        ) -> Result<Vec<ReleaseRecord>, StoreError> {
            self.inner.releases_needing_enrichment(limit)
        }
        fn query_releases(&self, query: &ReleaseQuery) -> Result<ReleasePage, StoreError> {
            self.inner.query_releases(query)
        }
        fn count_releases(&self, query: &ReleaseQuery) -> Result<usize, StoreError> {
            self.inner.count_releases(query)
        }
        fn release_stats(&self) -> Result<ReleaseStats, StoreError> {
            self.inner.release_stats()
        }
    }

    #[test]
    fn insert_conflict_falls_back_to_update() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(RacingStore {
            inner: SqliteReleaseStore::new(temp_dir.path().join("releases.db")).unwrap(),
            lookups: Mutex::new(0),
        });
        let engine = UpsertEngine::new(store.clone());

        let outcome = engine.upsert(&candidate("Wilco", "Cousin")).unwrap();
        assert!(matches!(outcome, UpsertOutcome::Updated(_)));
        assert_eq!(*store.lookups.lock().unwrap(), 2);
    }

    struct UnavailableStore;

    impl ReleaseStore for UnavailableStore {
        fn find_by_identity(&self, _: &ReleaseIdentity) -> Result<Option<ReleaseRecord>, StoreError> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }
        fn insert(&self, _: &CandidateRecord) -> Result<InsertOutcome, StoreError> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }
        fn update_fill_only(&self, _: i64, _: &FillOnlyUpdate) -> Result<ReleaseRecord, StoreError> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }
        fn releases_needing_enrichment(&self, _: usize) -> Result<Vec<ReleaseRecord>, StoreError> {
            Ok(vec![])
        }
        fn query_releases(&self, _: &ReleaseQuery) -> Result<ReleasePage, StoreError> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }
        fn count_releases(&self, _: &ReleaseQuery) -> Result<usize, StoreError> {
            Ok(0)
        }
        fn release_stats(&self) -> Result<ReleaseStats, StoreError> {
            Err(StoreError::Unavailable("disk I/O error".to_string()))
        }
    }

    #[test]
    fn unavailable_store_is_an_error_not_a_rejection() {
        let engine = UpsertEngine::new(Arc::new(UnavailableStore));
        let err = engine.upsert(&candidate("A", "B")).unwrap_err();
        assert!(err.is_fatal());
    }
}
