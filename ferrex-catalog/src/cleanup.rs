use std::sync::Arc;
use std::time::Duration;

use ferrex_contracts::{Clock, SystemClock};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::store::CatalogStore;

/// Periodically sweeps expired sessions and ceremony challenges. Runs
/// until `shutdown` is signalled.
pub struct CleanupTask {
    store: CatalogStore,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl CleanupTask {
    pub fn new(store: CatalogStore, interval: Duration) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            interval,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = self.interval.as_secs(), "catalog cleanup task started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("catalog cleanup task shutting down");
                        return;
                    }
                }
            }
        }
    }

    async fn sweep_once(&self) {
        match self.store.delete_expired_sessions(self.clock.as_ref()).await {
            Ok(count) => debug!(count, "swept expired sessions"),
            Err(err) => tracing::warn!(%err, "failed to sweep expired sessions"),
        }
        match self.store.sweep_expired_challenges(self.clock.as_ref()).await {
            Ok(count) => debug!(count, "swept expired ceremony challenges"),
            Err(err) => tracing::warn!(%err, "failed to sweep expired ceremony challenges"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use ferrex_contracts::{FixedClock, NullObserver};
    use tokio::sync::watch;

    use super::*;

    #[tokio::test]
    async fn sweep_once_clears_expired_sessions_and_challenges() {
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let user = store.create_user("password").await.unwrap();
        store
            .create_session_with(user.id, clock.as_ref(), 5)
            .await
            .unwrap();
        store
            .put_challenge("sess-1", b"bytes", clock.as_ref())
            .await
            .unwrap();
        clock.advance(chrono::Duration::seconds(1000));

        let task = CleanupTask::new(store.clone(), Duration::from_secs(1))
            .with_clock(clock.clone());
        task.sweep_once().await;

        assert_eq!(store.delete_expired_sessions(clock.as_ref()).await.unwrap(), 0);
        assert_eq!(
            store.sweep_expired_challenges(clock.as_ref()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn run_exits_on_shutdown_signal() {
        let store = CatalogStore::open_in_memory(Arc::new(NullObserver::default()))
            .await
            .unwrap();
        let task = CleanupTask::new(store, Duration::from_secs(3600));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(task.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cleanup task should exit promptly on shutdown")
            .unwrap();
    }
}
