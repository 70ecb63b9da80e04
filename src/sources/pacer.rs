use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default spacing between Discogs calls.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(1100);

/// Serializes outbound requests with a fixed minimum spacing.
///
/// The lock is held while waiting, so concurrent callers queue up and each
/// gets its own slot.
pub struct RequestPacer {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    /// Waits until at least `interval` has passed since the previous call.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}
