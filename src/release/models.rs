use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const DEFAULT_FORMAT: &str = "Vinyl";

// =============================================================================
// Source
// =============================================================================

/// Origin system of a release. Scopes the dedup identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Reddit,
    Discogs,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Reddit => "reddit",
            Source::Discogs => "discogs",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reddit" => Some(Source::Reddit),
            "discogs" => Some(Source::Discogs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Candidate
// =============================================================================

/// Community signals carried by Reddit postings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedditExtras {
    pub subreddit: String,
    pub score: i64,
    pub num_comments: i64,
    pub author: Option<String>,
    pub flair: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Structured data from one fetch and parse of one posting. Never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub artist: String,
    pub album: String,
    pub label: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub preorder_date: Option<NaiveDate>,
    pub genres: BTreeSet<String>,
    pub formats: Vec<String>,
    /// True when `formats` holds the `["Vinyl"]` fallback rather than detected tokens.
    pub formats_inferred: bool,
    pub price: Option<f64>,
    pub cover_url: Option<String>,
    pub purchase_url: Option<String>,
    pub description: Option<String>,
    pub source: Source,
    pub source_id: String,
    pub source_url: String,
    pub reddit: Option<RedditExtras>,
}

impl CandidateRecord {
    /// A candidate with only the identity and provenance filled in.
    pub fn new(
        artist: impl Into<String>,
        album: impl Into<String>,
        source: Source,
        source_id: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
            label: None,
            release_date: None,
            preorder_date: None,
            genres: BTreeSet::new(),
            formats: vec![DEFAULT_FORMAT.to_string()],
            formats_inferred: true,
            price: None,
            cover_url: None,
            purchase_url: None,
            description: None,
            source,
            source_id: source_id.into(),
            source_url: source_url.into(),
            reddit: None,
        }
    }

    /// Replaces the format list, falling back to `["Vinyl"]` when `formats` is empty.
    pub fn with_formats(mut self, formats: Vec<String>) -> Self {
        if formats.is_empty() {
            self.formats = vec![DEFAULT_FORMAT.to_string()];
            self.formats_inferred = true;
        } else {
            self.formats = formats;
            self.formats_inferred = false;
        }
        self
    }

    pub fn identity(&self) -> ReleaseIdentity {
        ReleaseIdentity::new(&self.artist, &self.album, self.source)
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Dedup key: `(lower(trim(artist)), lower(trim(album)), source)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseIdentity {
    pub artist_key: String,
    pub album_key: String,
    pub source: Source,
}

impl ReleaseIdentity {
    pub fn new(artist: &str, album: &str, source: Source) -> Self {
        Self {
            artist_key: identity_key(artist),
            album_key: identity_key(album),
            source,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.artist_key.is_empty() || self.album_key.is_empty()
    }
}

pub fn identity_key(value: &str) -> String {
    value.trim().to_lowercase()
}

// =============================================================================
// Persisted release
// =============================================================================

/// A stored release row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    pub id: i64,
    pub artist: String,
    pub album: String,
    pub label: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub preorder_date: Option<NaiveDate>,
    pub genres: BTreeSet<String>,
    pub formats: Vec<String>,
    pub price: Option<f64>,
    pub cover_url: Option<String>,
    pub purchase_url: Option<String>,
    pub description: Option<String>,
    pub source: Source,
    pub source_id: String,
    pub source_url: String,
    pub subreddit: Option<String>,
    pub reddit_score: Option<i64>,
    pub num_comments: Option<i64>,
    pub posted_at: Option<DateTime<Utc>>,
    pub posted_by: Option<String>,
    pub flair: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReleaseRecord {
    pub fn identity(&self) -> ReleaseIdentity {
        ReleaseIdentity::new(&self.artist, &self.album, self.source)
    }
}
