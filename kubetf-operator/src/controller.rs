use crate::config::Config;
use crate::watch::ChangeWatcher;
use crate::work_queue::WorkQueue;
use futures_util::stream::{self, StreamExt};
use kubetf_controller::{Outcome, Reconciler};
use kubetf_store::{Api, ObjectStore, StoreError};
use kubetf_types::{ObjectKey, Resource, Workspace};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub sync_interval: Duration,
    pub retry_delay: Duration,
    pub reconcile_timeout: Duration,
    pub max_concurrent: usize,
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            sync_interval: config.sync_interval(),
            retry_delay: config.retry_delay(),
            reconcile_timeout: config.reconcile_timeout(),
            max_concurrent: config.max_concurrent_reconciles.max(1),
        }
    }
}

/// Poll-driven controller loop
///
/// Each poll lists the watched kinds, schedules the workspaces affected by
/// changes and reconciles every workspace that is due, a bounded number at a
/// time. Failed reconciles are rescheduled according to their [`Outcome`].
/// All workspaces are rescheduled on every sync interval.
pub struct Controller {
    reconciler: Arc<Reconciler>,
    workspaces: Api<Workspace>,
    watcher: ChangeWatcher,
    queue: WorkQueue,
    settings: ControllerSettings,
}

impl Controller {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        reconciler: Reconciler,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            reconciler: Arc::new(reconciler),
            workspaces: Api::new(store.clone()),
            watcher: ChangeWatcher::new(store),
            queue: WorkQueue::new(),
            settings,
        }
    }

    /// Number of workspaces scheduled for a later reconcile
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Controller running (poll every {:?}, resync every {:?})",
            self.settings.poll_interval, self.settings.sync_interval
        );

        let mut poll = interval(self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut resync = interval(self.settings.sync_interval);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = resync.tick() => {
                    if let Err(e) = self.resync().await {
                        error!("Resync failed: {}", e);
                    }
                }
                _ = poll.tick() => {
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        result = self.poll() => {
                            if let Err(e) = result {
                                error!("Poll failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        info!("Controller stopped");
    }

    /// Schedule every workspace for an immediate reconcile
    pub async fn resync(&mut self) -> Result<(), StoreError> {
        let now = Instant::now();
        let workspaces = self.workspaces.list_all().await?;
        debug!("Resyncing {} workspaces", workspaces.len());
        for ws in workspaces {
            self.queue.schedule(ws.key(), now);
        }
        Ok(())
    }

    /// Pick up changes and reconcile whatever is due. Returns the number of
    /// reconciles performed.
    pub async fn poll(&mut self) -> Result<usize, StoreError> {
        let now = Instant::now();
        for key in self.watcher.changed().await? {
            self.queue.schedule(key, now);
        }
        Ok(self.process_due().await)
    }

    async fn process_due(&mut self) -> usize {
        let keys = self.queue.take_due(Instant::now());
        if keys.is_empty() {
            return 0;
        }

        let limit = self.settings.reconcile_timeout;
        let retry_delay = self.settings.retry_delay;
        let results: Vec<(ObjectKey, Outcome)> = stream::iter(keys)
            .map(|key| {
                let reconciler = self.reconciler.clone();
                async move {
                    let outcome = match timeout(limit, reconciler.reconcile_outcome(&key)).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!(workspace = %key, "Reconcile timed out after {:?}", limit);
                            Outcome::RetryAfter(retry_delay)
                        }
                    };
                    (key, outcome)
                }
            })
            .buffer_unordered(self.settings.max_concurrent)
            .collect()
            .await;

        let count = results.len();
        for (key, outcome) in results {
            self.apply(key, outcome);
        }
        count
    }

    fn apply(&mut self, key: ObjectKey, outcome: Outcome) {
        let now = Instant::now();
        match outcome {
            Outcome::Done => debug!(workspace = %key, "Reconciled"),
            Outcome::RetryNow => {
                debug!(workspace = %key, "Write conflict, retrying");
                self.queue.schedule(key, now);
            }
            Outcome::RetryAfter(delay) => {
                warn!(workspace = %key, "Reconcile failed, retrying in {:?}", delay);
                self.queue.schedule(key, now + delay);
            }
            Outcome::Fatal(message) => {
                error!(workspace = %key, "Reconcile failed: {}", message);
            }
        }
    }
}
