use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub user_agent: Option<String>,
    pub http_timeout_sec: Option<u64>,

    // Source configs
    pub reddit: Option<RedditConfig>,
    pub discogs: Option<DiscogsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RedditConfig {
    pub base_url: Option<String>,
    /// Replaces the built-in subreddit list when present.
    pub sources: Option<Vec<RedditSourceConfig>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedditSourceConfig {
    pub subreddit: String,
    pub limit: Option<usize>,
    /// Empty or missing means every post is accepted.
    #[serde(default)]
    pub allowed_flairs: Vec<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DiscogsConfig {
    pub enabled: Option<bool>,
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub base_url: Option<String>,
    pub request_interval_ms: Option<u64>,
    pub new_releases_limit: Option<usize>,
    pub enrich_limit: Option<usize>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
