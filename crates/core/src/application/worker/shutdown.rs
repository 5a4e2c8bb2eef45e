// Cooperative shutdown signal
// The flag is observed between loop iterations, never mid-iteration: an
// in-progress job or store call always completes before a loop exits.

use std::time::Duration;
use tokio::sync::watch;

/// Shutdown signal handed to each worker loop.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// Check whether shutdown was requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the shutdown signal. Returns immediately if it already
    /// fired; a dropped sender counts as shutdown.
    pub async fn wait(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        let _ = self.rx.changed().await;
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `true` when the sleep was interrupted by shutdown — the
    /// caller's cue to exit its loop instead of starting another iteration.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = self.wait() => true,
        }
    }
}

/// Shutdown sender
pub struct ShutdownSender {
    tx: watch::Sender<bool>,
}

impl ShutdownSender {
    /// Signal shutdown to every token. Does not block.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a shutdown channel
pub fn shutdown_channel() -> (ShutdownSender, ShutdownToken) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSender { tx }, ShutdownToken { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_observes_signal() {
        tokio_test::block_on(async {
            let (tx, token) = shutdown_channel();
            assert!(!token.is_shutdown());
            tx.shutdown();
            assert!(token.is_shutdown());
        });
    }

    #[test]
    fn sleep_is_interrupted_by_shutdown() {
        tokio_test::block_on(async {
            let (tx, mut token) = shutdown_channel();
            tx.shutdown();
            // would otherwise park for an hour
            assert!(token.sleep(Duration::from_secs(3600)).await);
        });
    }

    #[test]
    fn sleep_runs_to_completion_without_signal() {
        tokio_test::block_on(async {
            let (_tx, mut token) = shutdown_channel();
            assert!(!token.sleep(Duration::from_millis(5)).await);
        });
    }

    #[test]
    fn wait_returns_for_late_subscribers() {
        tokio_test::block_on(async {
            let (tx, token) = shutdown_channel();
            tx.shutdown();
            let mut cloned = token.clone();
            // signal fired before wait was called
            cloned.wait().await;
        });
    }
}
