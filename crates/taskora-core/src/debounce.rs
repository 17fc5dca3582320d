//! Quiet-window scheduling for search-driven queries
//!
//! Each [`Debouncer::schedule`] call cancels the pending one, so only the last
//! call within the window runs. Cancellation also covers a future that has
//! already started; its result is dropped.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use taskora_config::SearchConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Default quiet window
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct Debouncer {
    window: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(None),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(config.debounce())
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `task` after the quiet window unless another call arrives first
    ///
    /// The handle resolves to `None` when the call was superseded or
    /// cancelled.
    pub fn schedule<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let token = CancellationToken::new();
        if let Some(previous) = self.pending.lock().replace(token.clone()) {
            trace!("Superseding pending debounced call");
            previous.cancel();
        }

        let window = self.window;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = async {
                    tokio::time::sleep(window).await;
                    task.await
                } => Some(output),
            }
        })
    }

    /// Drop the pending call, if any
    pub fn cancel(&self) {
        if let Some(pending) = self.pending.lock().take() {
            pending.cancel();
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}
