//! Trailing-edge debouncer: one firing per quiet period.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Collapses bursts of notifications into one callback.
///
/// Every `notify()` restarts the quiet-period timer; the callback fires only once the
/// timer elapses with no further notifications. Dropping the handle stops the task
/// without firing, even when the quiet period has already elapsed but the task hasn't
/// run yet, so a pending refresh for a detached source is discarded.
pub struct Debouncer {
    tx: mpsc::UnboundedSender<()>,
    detached: CancellationToken,
}

impl Debouncer {
    /// Spawns the debounce task on `runtime`.
    pub fn spawn<F>(runtime: &Handle, quiet: Duration, on_fire: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let detached = CancellationToken::new();
        let token = detached.clone();

        runtime.spawn(async move {
            loop {
                // Wait for the first event of a burst
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    event = rx.recv() => {
                        if event.is_none() {
                            return;
                        }
                    }
                }

                loop {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        event = rx.recv() => {
                            if event.is_none() {
                                return;
                            }
                            // Another event: restart the quiet period
                        }
                        _ = tokio::time::sleep(quiet) => break,
                    }
                }

                if token.is_cancelled() {
                    return;
                }
                log::debug!("Debouncer: quiet for {}ms, firing", quiet.as_millis());
                on_fire();
            }
        });

        Self { tx, detached }
    }

    /// Records one event. Callable from any thread, never blocks.
    pub fn notify(&self) {
        let _ = self.tx.send(());
    }

    /// Returns a cheap handle that can notify from another thread or callback.
    pub(crate) fn notifier(&self) -> mpsc::UnboundedSender<()> {
        self.tx.clone()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.detached.cancel();
    }
}
