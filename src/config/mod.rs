mod file_config;

pub use file_config::{DiscogsConfig, FileConfig, RedditConfig, RedditSourceConfig};

use crate::sources::discogs::{DiscogsCredentials, DISCOGS_API_BASE};
use crate::sources::pacer::DEFAULT_REQUEST_INTERVAL;
use crate::sources::reddit::REDDIT_API_BASE;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "vinyl-drop/0.1 (release aggregator)";
pub const DEFAULT_HTTP_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_SOURCE_LIMIT: usize = 50;

/// CLI arguments that can be used for config resolution.
/// TOML config values take precedence over these.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub discogs_consumer_key: Option<String>,
    pub discogs_consumer_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub user_agent: String,
    pub http_timeout: Duration,

    pub reddit: RedditSettings,
    pub discogs: DiscogsSettings,
}

#[derive(Debug, Clone)]
pub struct RedditSettings {
    pub base_url: String,
    pub sources: Vec<RedditSourceSettings>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RedditSourceSettings {
    pub subreddit: String,
    pub limit: usize,
    pub allowed_flairs: Vec<String>,
}

impl RedditSourceSettings {
    /// Built-in subreddits: every post of r/VinylReleases, release-flaired posts of r/VGMvinyl.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                subreddit: "VinylReleases".to_string(),
                limit: 150,
                allowed_flairs: Vec::new(),
            },
            Self {
                subreddit: "VGMvinyl".to_string(),
                limit: 50,
                allowed_flairs: vec![
                    "New Release".to_string(),
                    "Pre-Order".to_string(),
                    "Back in Stock".to_string(),
                ],
            },
        ]
    }
}

#[derive(Debug, Clone)]
pub struct DiscogsSettings {
    pub enabled: bool,
    /// The search endpoint needs these; without them Discogs is skipped.
    pub credentials: Option<DiscogsCredentials>,
    pub base_url: String,
    pub request_interval: Duration,
    pub new_releases_limit: usize,
    pub enrich_limit: usize,
}

impl DiscogsSettings {
    pub fn is_usable(&self) -> bool {
        self.enabled && self.credentials.is_some()
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let user_agent = file
            .user_agent
            .or_else(|| cli.user_agent.clone())
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let http_timeout_sec = file
            .http_timeout_sec
            .or(cli.http_timeout_sec)
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SEC);

        let reddit_file = file.reddit.unwrap_or_default();
        let sources = match reddit_file.sources {
            Some(sources) => sources
                .into_iter()
                .map(|s| {
                    let subreddit = s.subreddit.trim().to_string();
                    if subreddit.is_empty() {
                        bail!("reddit.sources entries need a subreddit name");
                    }
                    Ok(RedditSourceSettings {
                        subreddit,
                        limit: s.limit.unwrap_or(DEFAULT_SOURCE_LIMIT),
                        allowed_flairs: s.allowed_flairs,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => RedditSourceSettings::defaults(),
        };
        let reddit = RedditSettings {
            base_url: reddit_file
                .base_url
                .unwrap_or_else(|| REDDIT_API_BASE.to_string()),
            sources,
        };

        let discogs_file = file.discogs.unwrap_or_default();
        let consumer_key = discogs_file
            .consumer_key
            .or_else(|| cli.discogs_consumer_key.clone());
        let consumer_secret = discogs_file
            .consumer_secret
            .or_else(|| cli.discogs_consumer_secret.clone());
        let credentials = match (consumer_key, consumer_secret) {
            (Some(consumer_key), Some(consumer_secret)) => Some(DiscogsCredentials {
                consumer_key,
                consumer_secret,
            }),
            (None, None) => None,
            _ => bail!("Both Discogs consumer key and secret must be provided together"),
        };
        let discogs = DiscogsSettings {
            enabled: discogs_file.enabled.unwrap_or(true),
            credentials,
            base_url: discogs_file
                .base_url
                .unwrap_or_else(|| DISCOGS_API_BASE.to_string()),
            request_interval: discogs_file
                .request_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REQUEST_INTERVAL),
            new_releases_limit: discogs_file
                .new_releases_limit
                .unwrap_or(DEFAULT_SOURCE_LIMIT),
            enrich_limit: discogs_file.enrich_limit.unwrap_or(DEFAULT_SOURCE_LIMIT),
        };

        Ok(Self {
            db_dir,
            user_agent,
            http_timeout: Duration::from_secs(http_timeout_sec),
            reddit,
            discogs,
        })
    }

    pub fn releases_db_path(&self) -> PathBuf {
        self.db_dir.join("releases.db")
    }
}
