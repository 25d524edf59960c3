use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::trace;

/// Enforces a minimum spacing between consecutive external calls.
///
/// Callers queue on the lock, so the spacing holds across concurrently running tokens.
#[derive(Debug)]
pub struct RequestPacer {
    min_spacing: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RequestPacer {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_call: Mutex::new(None),
        }
    }

    pub fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Wait until the next call is allowed, then claim the slot
    pub async fn wait(&self) {
        if self.min_spacing.is_zero() {
            return;
        }

        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_spacing;
            if ready_at > Instant::now() {
                trace!("Pacing external call for {:?}", ready_at - Instant::now());
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}
