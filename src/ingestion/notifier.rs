//! New-release notifications.

use crate::release::CandidateRecord;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

/// Receives releases right after their first insert.
///
/// Delivery is fire-and-forget: a failure is logged and never affects the
/// stored row.
#[async_trait]
pub trait ReleaseNotifier: Send + Sync {
    async fn release_added(&self, id: i64, release: &CandidateRecord) -> Result<()>;
}

/// Writes one log line per new release.
pub struct LogNotifier;

#[async_trait]
impl ReleaseNotifier for LogNotifier {
    async fn release_added(&self, id: i64, release: &CandidateRecord) -> Result<()> {
        info!(
            "New release #{}: {} - {} ({})",
            id, release.artist, release.album, release.source
        );
        Ok(())
    }
}

/// Spawns delivery of `release` to `notifier` on `tracker` without waiting for it.
pub(crate) fn spawn_release_added(
    tracker: &TaskTracker,
    notifier: Arc<dyn ReleaseNotifier>,
    id: i64,
    release: CandidateRecord,
) {
    tracker.spawn(async move {
        if let Err(e) = notifier.release_added(id, &release).await {
            warn!(
                "Failed to notify about release #{} ({} - {}): {}",
                id, release.artist, release.album, e
            );
        }
    });
}
