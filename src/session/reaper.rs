//! Background eviction of idle sessions.

use super::store::SessionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawns the idle-session sweep.
#[derive(Debug, Clone, Copy)]
pub struct SessionReaper;

impl SessionReaper {
    /// Starts a task that evicts sessions idle for `idle_timeout`, checking
    /// every `interval`.
    ///
    /// The first sweep happens one interval after spawning.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn SessionStore>,
        interval: Duration,
        idle_timeout: Duration,
    ) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {
                        let evicted = store.evict_idle(idle_timeout).await;
                        if !evicted.is_empty() {
                            tracing::debug!(count = evicted.len(), "reaper swept idle sessions");
                        }
                    }
                }
            }
            tracing::debug!("session reaper stopped");
        });

        tracing::debug!(
            interval_secs = interval.as_secs(),
            idle_timeout_secs = idle_timeout.as_secs(),
            "session reaper started"
        );
        ReaperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running reaper.
#[derive(Debug)]
pub struct ReaperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for its task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "session reaper task failed");
        }
    }
}

impl Drop for ReaperHandle {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::InMemorySessionStore;
    use crate::workspace::EscapePolicy;
    use tempfile::TempDir;

    #[tokio::test]
    async fn reaper_evicts_idle_sessions() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(dir.path(), EscapePolicy::Rebase));
        store.get_or_create(Some("idle")).await.unwrap();

        let reaper = SessionReaper::spawn(
            Arc::clone(&store),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        reaper.shutdown().await;

        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn reaper_keeps_locked_sessions() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(dir.path(), EscapePolicy::Rebase));
        let busy = store.get_or_create(Some("busy")).await.unwrap();
        let guard = busy.lock().await;

        let reaper = SessionReaper::spawn(
            Arc::clone(&store),
            Duration::from_millis(20),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(200)).await;
        reaper.shutdown().await;
        drop(guard);

        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_task() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn SessionStore> =
            Arc::new(InMemorySessionStore::new(dir.path(), EscapePolicy::Rebase));
        let reaper = SessionReaper::spawn(store, Duration::from_secs(3600), Duration::from_secs(1));
        tokio::time::timeout(Duration::from_secs(1), reaper.shutdown())
            .await
            .unwrap();
    }
}
