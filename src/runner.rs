//! Builds runnable sources and clients from resolved configuration.

use crate::config::AppConfig;
use crate::ingestion::SourceRun;
use crate::sources::{DiscogsClient, DiscogsNewReleases, RedditClient, RedditSource};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Discogs client for `config`, or `None` when Discogs is disabled or has no credentials.
pub fn discogs_client(config: &AppConfig) -> Result<Option<Arc<DiscogsClient>>> {
    let settings = &config.discogs;
    if !settings.is_usable() {
        if settings.enabled {
            warn!("No Discogs consumer key/secret configured, skipping Discogs");
        } else {
            info!("Discogs disabled in config");
        }
        return Ok(None);
    }

    let client = DiscogsClient::new(
        &config.user_agent,
        config.http_timeout,
        settings.credentials.clone(),
        &settings.base_url,
        settings.request_interval,
    )
    .context("Failed to build Discogs HTTP client")?;
    Ok(Some(Arc::new(client)))
}

/// Every configured subreddit in order, then the Discogs new-releases feed.
pub fn build_source_runs(config: &AppConfig, skip_discogs: bool) -> Result<Vec<SourceRun>> {
    let reddit = RedditClient::with_base_url(
        &config.user_agent,
        config.http_timeout,
        &config.reddit.base_url,
    )
    .context("Failed to build Reddit HTTP client")?;

    let mut runs: Vec<SourceRun> = config
        .reddit
        .sources
        .iter()
        .map(|s| {
            SourceRun::new(
                Box::new(RedditSource::new(
                    reddit.clone(),
                    &s.subreddit,
                    s.allowed_flairs.clone(),
                )),
                s.limit,
            )
        })
        .collect();

    if !skip_discogs {
        if let Some(client) = discogs_client(config)? {
            runs.push(SourceRun::new(
                Box::new(DiscogsNewReleases::new(client)),
                config.discogs.new_releases_limit,
            ));
        }
    }

    Ok(runs)
}
