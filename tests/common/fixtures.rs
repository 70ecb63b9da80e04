use std::sync::Arc;
use tempfile::TempDir;
use vinyl_drop::release::{CandidateRecord, RedditExtras, ReleaseRecord, Source};
use vinyl_drop::release_store::{ReleaseQuery, ReleaseStore, SqliteReleaseStore};

/// A release store backed by a database file in its own temporary directory.
pub struct TestStore {
    pub store: Arc<SqliteReleaseStore>,
    // Keeps the directory alive for the store's lifetime
    pub dir: TempDir,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteReleaseStore::new(dir.path().join("releases.db")).unwrap());
        Self { store, dir }
    }

    pub fn as_dyn(&self) -> Arc<dyn ReleaseStore> {
        self.store.clone()
    }

    pub fn all(&self) -> Vec<ReleaseRecord> {
        self.store
            .query_releases(&ReleaseQuery {
                limit: Some(200),
                ..Default::default()
            })
            .unwrap()
            .releases
    }

    pub fn count(&self) -> usize {
        self.store.count_releases(&ReleaseQuery::default()).unwrap()
    }
}

#[allow(dead_code)]
pub fn reddit_candidate(artist: &str, album: &str, post_id: &str, score: i64) -> CandidateRecord {
    let mut candidate = CandidateRecord::new(
        artist,
        album,
        Source::Reddit,
        post_id,
        format!("https://www.reddit.com/r/VinylReleases/comments/{}/", post_id),
    );
    candidate.reddit = Some(RedditExtras {
        subreddit: "VinylReleases".to_string(),
        score,
        num_comments: 0,
        author: Some("poster".to_string()),
        flair: None,
        posted_at: None,
    });
    candidate
}
