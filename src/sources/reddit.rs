//! Reddit listing adapter.
//!
//! Reads `/r/{subreddit}/new.json` and turns each post title into a
//! candidate through the title normalizer.

use super::retailers;
use super::{is_absolute_http_url, non_blank, ReleaseSource, SourceError};
use crate::normalizer::parse_title;
use crate::release::{CandidateRecord, RedditExtras, Source};
use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const REDDIT_API_BASE: &str = "https://www.reddit.com";
const REDDIT_WEB_BASE: &str = "https://www.reddit.com";

/// Thumbnail values Reddit uses in place of an image URL.
const PLACEHOLDER_THUMBNAILS: &[&str] = &["self", "default", "nsfw", "spoiler", "image", ""];

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: RedditPost,
}

/// One post from a subreddit listing. Only the consumed fields are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: Option<String>,
    #[serde(default)]
    pub permalink: String,
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    pub author: Option<String>,
    pub link_flair_text: Option<String>,
    pub thumbnail: Option<String>,
    pub preview: Option<Preview>,
    pub selftext: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewImage {
    pub source: Option<PreviewSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewSource {
    pub url: Option<String>,
}

/// HTTP client for the Reddit JSON listing endpoints.
#[derive(Clone)]
pub struct RedditClient {
    client: Client,
    base_url: String,
}

impl RedditClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(user_agent, timeout, REDDIT_API_BASE)
    }

    pub fn with_base_url(user_agent: &str, timeout: Duration, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches the newest posts of `subreddit`, at most `limit` of them.
    pub async fn new_posts(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> Result<Vec<RedditPost>, SourceError> {
        let url = format!(
            "{}/r/{}/new.json?limit={}",
            self.base_url,
            urlencoding::encode(subreddit),
            limit
        );
        debug!("Fetching {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let listing: Listing = serde_json::from_str(&body)
            .map_err(|e| SourceError::Malformed(format!("r/{} listing: {}", subreddit, e)))?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data)
            .take(limit)
            .collect())
    }
}

/// One subreddit, optionally restricted to a set of post flairs.
pub struct RedditSource {
    client: RedditClient,
    subreddit: String,
    allowed_flairs: Vec<String>,
}

impl RedditSource {
    /// An empty `allowed_flairs` accepts every post.
    pub fn new(client: RedditClient, subreddit: &str, allowed_flairs: Vec<String>) -> Self {
        Self {
            client,
            subreddit: subreddit.to_string(),
            allowed_flairs,
        }
    }
}

#[async_trait]
impl ReleaseSource for RedditSource {
    type Posting = RedditPost;

    fn label(&self) -> String {
        format!("reddit/r/{}", self.subreddit)
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<RedditPost>, SourceError> {
        self.client.new_posts(&self.subreddit, limit).await
    }

    fn accepts(&self, post: &RedditPost) -> bool {
        if self.allowed_flairs.is_empty() {
            return true;
        }
        match &post.link_flair_text {
            Some(flair) => self.allowed_flairs.iter().any(|allowed| allowed == flair),
            None => false,
        }
    }

    fn to_candidate(&self, post: RedditPost) -> Option<CandidateRecord> {
        if post.id.trim().is_empty() {
            return None;
        }

        let parsed = parse_title(&post.title);
        let cover_url = extract_cover_url(&post);
        let source_url = format!("{}{}", REDDIT_WEB_BASE, post.permalink);

        let mut candidate = CandidateRecord::new(
            parsed.artist,
            parsed.album,
            Source::Reddit,
            post.id,
            source_url,
        )
        .with_formats(parsed.formats);
        candidate.genres = parsed.genres;
        candidate.price = parsed.price;
        candidate.cover_url = cover_url;
        candidate.purchase_url = post.url.as_deref().and_then(retailers::purchase_url);
        candidate.description = non_blank(post.selftext);
        candidate.reddit = Some(RedditExtras {
            subreddit: self.subreddit.clone(),
            score: post.score,
            num_comments: post.num_comments,
            author: post.author,
            flair: post.link_flair_text,
            posted_at: post
                .created_utc
                .and_then(|ts| DateTime::from_timestamp(ts.trunc() as i64, 0)),
        });
        Some(candidate)
    }
}

/// Preview image first, then a real thumbnail. Placeholders and relative URLs are ignored.
fn extract_cover_url(post: &RedditPost) -> Option<String> {
    let preview = post
        .preview
        .as_ref()
        .and_then(|preview| preview.images.first())
        .and_then(|image| image.source.as_ref())
        .and_then(|source| source.url.as_deref())
        .map(|url| url.replace("&amp;", "&"));
    if let Some(url) = preview.filter(|url| is_absolute_http_url(url)) {
        return Some(url);
    }

    post.thumbnail
        .as_deref()
        .filter(|thumb| !PLACEHOLDER_THUMBNAILS.contains(thumb) && is_absolute_http_url(thumb))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::CandidateFeed;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn post(value: serde_json::Value) -> RedditPost {
        serde_json::from_value(value).unwrap()
    }

    fn source(flairs: &[&str]) -> RedditSource {
        let client = RedditClient::new("vinyl-drop-test", Duration::from_secs(5)).unwrap();
        RedditSource::new(
            client,
            "VinylReleases",
            flairs.iter().map(|f| f.to_string()).collect(),
        )
    }

    #[test]
    fn maps_post_fields_onto_candidate() {
        let post = post(json!({
            "id": "abc123",
            "title": "[Preorder] Tame Impala - Currents [2LP] $34.99",
            "url": "https://tameimpala.bandcamp.com/album/currents",
            "permalink": "/r/VinylReleases/comments/abc123/tame_impala/",
            "created_utc": 1700000000.0,
            "score": 42,
            "num_comments": 7,
            "author": "crate_digger",
            "link_flair_text": "Pre-Order",
            "thumbnail": "self",
            "selftext": "  Ships in March  ",
            "preview": {
                "images": [{ "source": { "url": "https://preview.redd.it/x.jpg?width=640&amp;s=abc" } }]
            }
        }));

        let candidate = source(&[]).to_candidate(post).unwrap();
        assert_eq!(candidate.artist, "Tame Impala");
        assert_eq!(candidate.album, "Currents");
        assert_eq!(candidate.formats, vec!["2LP"]);
        assert!(!candidate.formats_inferred);
        assert_eq!(candidate.price, Some(34.99));
        assert_eq!(candidate.source, Source::Reddit);
        assert_eq!(candidate.source_id, "abc123");
        assert_eq!(
            candidate.source_url,
            "https://www.reddit.com/r/VinylReleases/comments/abc123/tame_impala/"
        );
        assert_eq!(
            candidate.cover_url.as_deref(),
            Some("https://preview.redd.it/x.jpg?width=640&s=abc")
        );
        assert_eq!(
            candidate.purchase_url.as_deref(),
            Some("https://tameimpala.bandcamp.com/album/currents")
        );
        assert_eq!(candidate.description.as_deref(), Some("Ships in March"));
        assert_eq!(candidate.label, None);
        assert_eq!(candidate.release_date, None);

        let extras = candidate.reddit.unwrap();
        assert_eq!(extras.subreddit, "VinylReleases");
        assert_eq!(extras.score, 42);
        assert_eq!(extras.num_comments, 7);
        assert_eq!(extras.flair.as_deref(), Some("Pre-Order"));
        assert_eq!(extras.posted_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn defaults_formats_and_drops_non_retail_links() {
        let post = post(json!({
            "id": "p1",
            "title": "Slowdive - Souvlaki",
            "url": "https://i.redd.it/cover.jpg",
            "permalink": "/r/VinylReleases/comments/p1/",
            "thumbnail": "https://b.thumbs.redditmedia.com/t.jpg",
            "selftext": ""
        }));

        let candidate = source(&[]).to_candidate(post).unwrap();
        assert_eq!(candidate.formats, vec!["Vinyl"]);
        assert!(candidate.formats_inferred);
        assert_eq!(candidate.purchase_url, None);
        assert_eq!(candidate.description, None);
        assert_eq!(
            candidate.cover_url.as_deref(),
            Some("https://b.thumbs.redditmedia.com/t.jpg")
        );
    }

    #[test]
    fn placeholder_thumbnail_yields_no_cover() {
        for thumb in ["self", "default", "nsfw", "spoiler", "image", ""] {
            let post = post(json!({
                "id": "p2",
                "title": "Low - HEY WHAT",
                "permalink": "/r/x/",
                "thumbnail": thumb
            }));
            assert_eq!(extract_cover_url(&post), None, "thumbnail {:?}", thumb);
        }
    }

    #[test]
    fn relative_preview_falls_back_to_thumbnail() {
        let post = post(json!({
            "id": "p3",
            "title": "Air - Moon Safari",
            "permalink": "/r/x/",
            "thumbnail": "https://thumbs.example/air.jpg",
            "preview": { "images": [{ "source": { "url": "/relative.jpg" } }] }
        }));
        assert_eq!(
            extract_cover_url(&post).as_deref(),
            Some("https://thumbs.example/air.jpg")
        );
    }

    #[test]
    fn flair_filter_rejects_missing_and_unlisted_flairs() {
        let source = source(&["New Release", "Pre-Order"]);
        let with = |flair: Option<&str>| {
            post(json!({ "id": "f", "title": "t", "link_flair_text": flair }))
        };
        assert!(source.accepts(&with(Some("Pre-Order"))));
        assert!(!source.accepts(&with(Some("Discussion"))));
        assert!(!source.accepts(&with(None)));
    }

    #[test]
    fn post_without_id_is_dropped() {
        let post = post(json!({ "id": " ", "title": "Artist - Album" }));
        assert!(source(&[]).to_candidate(post).is_none());
    }

    #[tokio::test]
    async fn fetches_listing_with_user_agent_and_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/VGMvinyl/new.json"))
            .and(query_param("limit", "2"))
            .and(header("user-agent", "vinyl-drop-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "children": [
                    { "data": { "id": "a", "title": "Koji Kondo - Zelda OST", "link_flair_text": "New Release", "permalink": "/a" } },
                    { "data": { "id": "b", "title": "Discussion thread", "link_flair_text": "Discussion", "permalink": "/b" } },
                    { "data": { "id": "c", "title": "Extra post", "permalink": "/c" } }
                ] }
            })))
            .mount(&server)
            .await;

        let client = RedditClient::with_base_url(
            "vinyl-drop-test",
            Duration::from_secs(5),
            &server.uri(),
        )
        .unwrap();
        let source = RedditSource::new(client, "VGMvinyl", vec!["New Release".to_string()]);

        let posts = source.fetch(2).await.unwrap();
        assert_eq!(posts.len(), 2);

        let candidates = source.fetch_candidates(2).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].artist, "Koji Kondo");
        assert_eq!(candidates[0].source_id, "a");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client =
            RedditClient::with_base_url("ua", Duration::from_secs(5), &server.uri()).unwrap();
        let err = client.new_posts("VinylReleases", 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_listing_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let client =
            RedditClient::with_base_url("ua", Duration::from_secs(5), &server.uri()).unwrap();
        let err = client.new_posts("VinylReleases", 10).await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
