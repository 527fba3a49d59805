//! Shutdown coordination for the stream host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::net::connection::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// Async tasks (acceptor, relay) subscribe to the broadcast channel. Blocking
/// workers cannot await, so they poll the stop flag between ticks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    stop: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Raise the stop flag, then notify subscribers.
    pub fn trigger(&self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.tx.send(());
    }

    /// Flag polled by blocking workers.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn is_triggered(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Stop accepting, ask every worker to close its socket, then wait up to
/// `deadline` for them to exit.
///
/// Returns `true` if every worker exited in time.
pub async fn stop(shutdown: &Shutdown, tracker: &ConnectionTracker, deadline: Duration) -> bool {
    tracing::info!(
        active_connections = tracker.active_count(),
        "Shutdown initiated, draining connections"
    );
    shutdown.trigger();

    let drained = tracker.wait_for_drain(deadline).await;
    if drained {
        tracing::info!("All connections drained");
    } else {
        tracing::warn!(
            remaining = tracker.active_count(),
            deadline_ms = deadline.as_millis() as u64,
            "Drain deadline passed with connections still open"
        );
    }
    drained
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_sets_flag_and_notifies() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let flag = shutdown.stop_flag();
        assert!(!flag.load(Ordering::Acquire));

        shutdown.trigger();
        assert!(flag.load(Ordering::Acquire));
        assert!(shutdown.is_triggered());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn stop_waits_for_guards() {
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let guard = tracker.track();

        let flag = shutdown.stop_flag();
        let worker = tokio::task::spawn_blocking(move || {
            while !flag.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(5));
            }
            drop(guard);
        });

        assert!(stop(&shutdown, &tracker, Duration::from_secs(5)).await);
        worker.await.unwrap();
        assert_eq!(tracker.active_count(), 0);
    }

    #[tokio::test]
    async fn stop_reports_timeout() {
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let _stuck = tracker.track();

        assert!(!stop(&shutdown, &tracker, Duration::from_millis(50)).await);
    }
}
