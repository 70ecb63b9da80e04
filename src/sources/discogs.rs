//! Discogs API adapter.
//!
//! Used two ways: as a lookup service that resolves an artist/album pair to
//! a structured release, and as a feed of newly added vinyl releases. Every
//! call goes through the client's [`RequestPacer`].

use super::pacer::RequestPacer;
use super::retailers;
use super::{absolutize, non_blank, ReleaseSource, SourceError};
use crate::release::{CandidateRecord, Source, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DISCOGS_API_BASE: &str = "https://api.discogs.com";
const DISCOGS_WEB_BASE: &str = "https://www.discogs.com";
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct DiscogsCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct SearchResult {
    id: Option<i64>,
}

/// Release detail as returned by `/releases/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsRelease {
    pub id: i64,
    pub title: Option<String>,
    pub artists_sort: Option<String>,
    #[serde(default)]
    pub artists: Vec<DiscogsArtist>,
    #[serde(default)]
    pub labels: Vec<DiscogsLabel>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub formats: Vec<DiscogsFormat>,
    #[serde(default)]
    pub images: Vec<DiscogsImage>,
    pub cover_image: Option<String>,
    pub thumb: Option<String>,
    pub released: Option<String>,
    pub year: Option<i32>,
    pub lowest_price: Option<f64>,
    pub notes: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsArtist {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsLabel {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsFormat {
    pub name: Option<String>,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscogsImage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub uri: Option<String>,
}

pub struct DiscogsClient {
    client: Client,
    base_url: String,
    credentials: Option<DiscogsCredentials>,
    pacer: RequestPacer,
}

impl DiscogsClient {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        credentials: Option<DiscogsCredentials>,
        base_url: &str,
        request_interval: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            pacer: RequestPacer::new(request_interval),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        self.pacer.wait().await;

        let url = format!("{}{}", self.base_url, path);
        let mut query: Vec<(&str, String)> = params.to_vec();
        if let Some(credentials) = &self.credentials {
            query.push(("key", credentials.consumer_key.clone()));
            query.push(("secret", credentials.consumer_secret.clone()));
        }
        debug!("Discogs GET {}", url);

        let response = self.client.get(&url).query(&query).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Malformed(format!("{}: {}", path, e)))
    }

    /// Id of the most relevant vinyl release matching `artist album`.
    pub async fn search_release(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<i64>, SourceError> {
        let params = [
            ("q", format!("{} {}", artist, album)),
            ("type", "release".to_string()),
            ("format", "vinyl".to_string()),
        ];
        let response: SearchResponse = self.get_json("/database/search", &params).await?;
        Ok(response.results.into_iter().find_map(|r| r.id))
    }

    pub async fn release(&self, release_id: i64) -> Result<DiscogsRelease, SourceError> {
        self.get_json(&format!("/releases/{}", release_id), &[])
            .await
    }

    /// Ids of the most recently added vinyl releases.
    pub async fn newest_vinyl(&self, limit: usize) -> Result<Vec<i64>, SourceError> {
        let params = [
            ("type", "release".to_string()),
            ("format", "vinyl".to_string()),
            ("sort", "added".to_string()),
            ("sort_order", "desc".to_string()),
            ("per_page", limit.min(MAX_PAGE_SIZE).to_string()),
        ];
        let response: SearchResponse = self.get_json("/database/search", &params).await?;
        Ok(response
            .results
            .into_iter()
            .filter_map(|r| r.id)
            .take(limit)
            .collect())
    }
}

/// Resolves an artist/album pair to authoritative release data.
#[async_trait]
pub trait ReleaseLookup: Send + Sync {
    async fn lookup(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<CandidateRecord>, SourceError>;
}

#[async_trait]
impl ReleaseLookup for DiscogsClient {
    async fn lookup(
        &self,
        artist: &str,
        album: &str,
    ) -> Result<Option<CandidateRecord>, SourceError> {
        let Some(release_id) = self.search_release(artist, album).await? else {
            return Ok(None);
        };
        let release = self.release(release_id).await?;
        Ok(Some(release_to_candidate(release)))
    }
}

/// Feed of the newest vinyl releases added to Discogs.
pub struct DiscogsNewReleases {
    client: Arc<DiscogsClient>,
}

impl DiscogsNewReleases {
    pub fn new(client: Arc<DiscogsClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReleaseSource for DiscogsNewReleases {
    type Posting = DiscogsRelease;

    fn label(&self) -> String {
        "discogs/new-releases".to_string()
    }

    async fn fetch(&self, limit: usize) -> Result<Vec<DiscogsRelease>, SourceError> {
        let ids = self.client.newest_vinyl(limit).await?;
        let mut releases = Vec::with_capacity(ids.len());
        for id in ids {
            match self.client.release(id).await {
                Ok(release) => releases.push(release),
                Err(e) => warn!("Skipping Discogs release {}: {}", id, e),
            }
        }
        Ok(releases)
    }

    fn to_candidate(&self, release: DiscogsRelease) -> Option<CandidateRecord> {
        Some(release_to_candidate(release))
    }
}

pub fn release_to_candidate(release: DiscogsRelease) -> CandidateRecord {
    let artist = non_blank(release.artists_sort.clone())
        .or_else(|| {
            release
                .artists
                .iter()
                .find_map(|a| non_blank(a.name.clone()))
        })
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = non_blank(release.title.clone()).unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    let web_url = non_blank(release.uri.clone()).map(|uri| absolutize(&uri, DISCOGS_WEB_BASE));
    let source_url = web_url
        .clone()
        .unwrap_or_else(|| format!("{}/release/{}", DISCOGS_WEB_BASE, release.id));

    let formats: Vec<String> = release
        .formats
        .iter()
        .flat_map(|format| {
            non_blank(format.name.clone())
                .into_iter()
                .chain(format.descriptions.iter().cloned())
        })
        .collect();

    let mut candidate = CandidateRecord::new(
        artist,
        album,
        Source::Discogs,
        release.id.to_string(),
        source_url,
    )
    .with_formats(formats);
    candidate.label = release.labels.iter().find_map(|l| non_blank(l.name.clone()));
    candidate.release_date = release_date(release.released.as_deref(), release.year);
    candidate.genres = release
        .genres
        .iter()
        .chain(release.styles.iter())
        .filter(|g| !g.trim().is_empty())
        .cloned()
        .collect();
    candidate.price = release.lowest_price.filter(|p| p.is_finite() && *p > 0.0);
    candidate.cover_url = cover_url(&release);
    candidate.purchase_url = web_url.as_deref().and_then(retailers::purchase_url);
    candidate.description = non_blank(release.notes);
    candidate
}

/// Primary image, then the first image, then the search artwork fields.
fn cover_url(release: &DiscogsRelease) -> Option<String> {
    let primary = release
        .images
        .iter()
        .find(|img| img.kind.as_deref() == Some("primary"))
        .and_then(|img| non_blank(img.uri.clone()));
    primary
        .or_else(|| release.images.first().and_then(|img| non_blank(img.uri.clone())))
        .or_else(|| non_blank(release.cover_image.clone()))
        .or_else(|| non_blank(release.thumb.clone()))
}

/// Exact `released` date when it parses, otherwise January 1st of the release year.
fn release_date(released: Option<&str>, year: Option<i32>) -> Option<NaiveDate> {
    if let Some(date) = released.and_then(|r| NaiveDate::parse_from_str(r.trim(), "%Y-%m-%d").ok())
    {
        return Some(date);
    }
    year.filter(|y| *y > 0)
        .or_else(|| {
            released
                .and_then(|r| r.trim().get(..4))
                .and_then(|prefix| prefix.parse::<i32>().ok())
                .filter(|y| *y > 0)
        })
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
}
