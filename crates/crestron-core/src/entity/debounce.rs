// Trailing-edge debounce for slider-style commands.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Window within which repeated commands collapse into one.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(200);

/// Runs only the last action scheduled within the delay window.
///
/// Each scheduled action waits in its own task; scheduling again cancels
/// the pending one. An action either fires or is cancelled, never both.
/// Dropping the debouncer cancels whatever is pending.
pub(crate) struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub(crate) fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => action.await,
            }
        });
    }

    pub(crate) fn cancel(&self) {
        if let Some(pending) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn record(hits: &Arc<AtomicU32>, value: u32) -> impl Future<Output = ()> + Send + 'static {
        let hits = Arc::clone(hits);
        async move {
            hits.fetch_add(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_last_action_fires() {
        let hits = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_DELAY);

        debouncer.schedule(record(&hits, 1));
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.schedule(record(&hits, 10));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_actions_both_fire() {
        let hits = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_DELAY);

        debouncer.schedule(record(&hits, 1));
        tokio::time::sleep(Duration::from_millis(250)).await;
        debouncer.schedule(record(&hits, 10));
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 11);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels_pending() {
        let hits = Arc::new(AtomicU32::new(0));
        let debouncer = Debouncer::new(DEBOUNCE_DELAY);

        debouncer.schedule(record(&hits, 1));
        drop(debouncer);
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
