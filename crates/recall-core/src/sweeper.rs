//! Background reclamation of abandoned review sessions.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::ReviewEngine;

/// Sweeper timing.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Time between sweeps. Clamped to at least one second.
    pub interval: StdDuration,
    /// Sessions idle for longer than this are reclaimed.
    pub max_age: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: StdDuration::from_secs(3600),
            max_age: Duration::hours(24),
        }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish its current sweep.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.task.await {
            tracing::warn!("session sweeper task failed: {e}");
        }
    }
}

/// Spawn a task that calls [`ReviewEngine::sweep_stale`] every
/// `config.interval`. The first sweep runs one interval after spawning.
pub fn spawn_sweeper(engine: Arc<ReviewEngine>, config: SweeperConfig) -> SweeperHandle {
    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    let period = config.interval.max(StdDuration::from_secs(1));

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = signal.notified() => break,
                _ = ticker.tick() => {
                    if let Err(e) = engine.sweep_stale(config.max_age).await {
                        tracing::warn!("session sweep failed: {e}");
                    }
                }
            }
        }
        tracing::debug!("session sweeper stopped");
    });

    tracing::debug!(interval_secs = period.as_secs(), "session sweeper started");
    SweeperHandle { shutdown, task }
}
