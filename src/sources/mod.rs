//! Source adapters.
//!
//! Each adapter fetches raw postings from one origin and maps them onto
//! [`CandidateRecord`]s. Adapters hold no accumulated state between runs; a
//! fetch returns a list and the caller decides what to do with it.

pub mod discogs;
pub mod pacer;
pub mod reddit;
pub mod retailers;

pub use discogs::{DiscogsClient, DiscogsNewReleases, ReleaseLookup};
pub use pacer::RequestPacer;
pub use reddit::{RedditClient, RedditSource};

use crate::release::CandidateRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while fetching from a remote source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned status {status}")]
    Status { status: u16, url: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Source misconfigured: {0}")]
    Config(String),
}

/// One origin of release postings.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Raw posting as delivered by the remote API.
    type Posting: Send;

    /// Short label used in logs and run reports, e.g. `reddit/r/VinylReleases`.
    fn label(&self) -> String;

    /// Fetches at most `limit` raw postings.
    async fn fetch(&self, limit: usize) -> Result<Vec<Self::Posting>, SourceError>;

    /// Tag filter applied before any parsing. Accepts everything by default.
    fn accepts(&self, _posting: &Self::Posting) -> bool {
        true
    }

    /// Maps one posting. `None` drops the posting without counting it.
    fn to_candidate(&self, posting: Self::Posting) -> Option<CandidateRecord>;
}

/// Object-safe view of a [`ReleaseSource`]: fetch, filter and map in one call.
#[async_trait]
pub trait CandidateFeed: Send + Sync {
    fn name(&self) -> String;

    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<CandidateRecord>, SourceError>;
}

#[async_trait]
impl<S> CandidateFeed for S
where
    S: ReleaseSource,
{
    fn name(&self) -> String {
        self.label()
    }

    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<CandidateRecord>, SourceError> {
        let postings = self.fetch(limit).await?;
        Ok(postings
            .into_iter()
            .filter(|posting| self.accepts(posting))
            .filter_map(|posting| self.to_candidate(posting))
            .collect())
    }
}

/// Makes a possibly relative URL absolute against `base`.
pub(crate) fn absolutize(url: &str, base: &str) -> String {
    if is_absolute_http_url(url) {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", base.trim_end_matches('/'), url)
    } else {
        format!("{}/{}", base.trim_end_matches('/'), url)
    }
}

pub(crate) fn is_absolute_http_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

/// Trims `value` and drops it when nothing is left.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::Source;

    struct FixedSource {
        postings: Vec<(String, bool)>,
    }

    #[async_trait]
    impl ReleaseSource for FixedSource {
        type Posting = (String, bool);

        fn label(&self) -> String {
            "fixed".to_string()
        }

        async fn fetch(&self, limit: usize) -> Result<Vec<Self::Posting>, SourceError> {
            Ok(self.postings.iter().take(limit).cloned().collect())
        }

        fn accepts(&self, posting: &Self::Posting) -> bool {
            posting.1
        }

        fn to_candidate(&self, posting: Self::Posting) -> Option<CandidateRecord> {
            if posting.0.is_empty() {
                return None;
            }
            Some(CandidateRecord::new(
                posting.0.clone(),
                "Album",
                Source::Reddit,
                posting.0,
                "https://example.com",
            ))
        }
    }

    #[tokio::test]
    async fn feed_filters_before_mapping_and_respects_limit() {
        let source = FixedSource {
            postings: vec![
                ("a".to_string(), true),
                ("b".to_string(), false),
                ("".to_string(), true),
                ("c".to_string(), true),
                ("d".to_string(), true),
            ],
        };

        let feed: &dyn CandidateFeed = &source;
        let candidates = feed.fetch_candidates(4).await.unwrap();
        let artists: Vec<&str> = candidates.iter().map(|c| c.artist.as_str()).collect();
        assert_eq!(artists, vec!["a", "c"]);
        assert_eq!(feed.name(), "fixed");
    }

    #[test]
    fn absolutize_keeps_absolute_and_prefixes_relative() {
        assert_eq!(
            absolutize("https://www.discogs.com/release/1", "https://www.discogs.com"),
            "https://www.discogs.com/release/1"
        );
        assert_eq!(
            absolutize("/release/1", "https://www.discogs.com/"),
            "https://www.discogs.com/release/1"
        );
        assert_eq!(
            absolutize("release/1", "https://www.discogs.com"),
            "https://www.discogs.com/release/1"
        );
    }

    #[test]
    fn absolute_url_requires_http_scheme_and_host() {
        assert!(is_absolute_http_url("https://i.redd.it/abc.jpg"));
        assert!(is_absolute_http_url("http://example.com"));
        assert!(!is_absolute_http_url("self"));
        assert!(!is_absolute_http_url("ftp://example.com/file"));
        assert!(!is_absolute_http_url("/relative/path"));
    }
}
