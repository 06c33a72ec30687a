//! Session cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// Cloneable stop request shared between a session and its controller.
///
/// The flag covers checks between awaits; the notifier wakes a session
/// that is parked on the source or the classifier.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_stopped_resolves_after_stop() {
        let handle = StopHandle::new();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.stopped().await })
        };
        tokio::task::yield_now().await;
        handle.stop();
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stop should wake the waiter")
            .unwrap();
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn test_stopped_is_immediate_when_already_stopped() {
        let handle = StopHandle::new();
        handle.stop();
        handle.stop();
        timeout(Duration::from_millis(50), handle.stopped())
            .await
            .unwrap();
    }
}
