use super::notifier::ReleaseNotifier;
use crate::release_store::ReleaseStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::warn;

/// Shared resources for one ingestion or enrichment run.
#[derive(Clone)]
pub struct RunContext {
    /// Checked between records; a cancelled run stops early and reports what it did.
    pub cancellation_token: CancellationToken,

    pub store: Arc<dyn ReleaseStore>,

    /// Told about newly inserted releases. Never awaited by the run.
    pub notifier: Option<Arc<dyn ReleaseNotifier>>,

    /// In-flight notification deliveries, shared by every clone of the context.
    pub notifications: TaskTracker,
}

impl RunContext {
    pub fn new(cancellation_token: CancellationToken, store: Arc<dyn ReleaseStore>) -> Self {
        Self {
            cancellation_token,
            store,
            notifier: None,
            notifications: TaskTracker::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ReleaseNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Waits up to `timeout` for spawned notifications and returns how many
    /// were still pending when it gave up.
    pub async fn finish_notifications(&self, timeout: Duration) -> usize {
        self.notifications.close();
        if tokio::time::timeout(timeout, self.notifications.wait())
            .await
            .is_ok()
        {
            return 0;
        }
        let pending = self.notifications.len();
        warn!(
            "Giving up on {} release notifications still pending after {:?}",
            pending, timeout
        );
        pending
    }
}
