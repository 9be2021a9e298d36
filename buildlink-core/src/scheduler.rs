//! Periodic refresh of the whole registry
//!
//! The startup refresh is the caller's job; the scheduler only handles the
//! repeats. The first tick fires one full period after `start`.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::catalog::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshSchedule {
    /// Only the startup refresh runs
    Disabled,
    Every(Duration),
}

impl RefreshSchedule {
    /// Map the `refetch_time` setting (seconds) to a schedule; zero or
    /// negative disables periodic refresh
    pub fn from_refetch_time(seconds: i64) -> Self {
        if seconds <= 0 {
            RefreshSchedule::Disabled
        } else {
            RefreshSchedule::Every(Duration::from_secs(seconds.unsigned_abs()))
        }
    }
}

pub struct Scheduler {
    registry: Arc<Registry>,
    schedule: RefreshSchedule,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(registry: Arc<Registry>, schedule: RefreshSchedule) -> Self {
        Self {
            registry,
            schedule,
            shutdown: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the refresh loop; a no-op when disabled or already started
    pub fn start(&mut self) {
        let RefreshSchedule::Every(period) = self.schedule else {
            info!("Periodic refresh disabled");
            return;
        };
        if self.handle.is_some() {
            return;
        }

        let (tx, rx) = watch::channel(false);
        let registry = self.registry.clone();
        self.handle = Some(tokio::spawn(run_refresh_loop(registry, period, rx)));
        self.shutdown = Some(tx);

        info!(interval_secs = period.as_secs(), "Refresh scheduler started");
    }

    /// Stop the loop and wait for it to exit
    ///
    /// A refresh already in progress finishes first; no new one starts.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Refresh scheduler task ended abnormally: {}", e);
            }
            info!("Refresh scheduler stopped");
        }
    }
}

async fn run_refresh_loop(
    registry: Arc<Registry>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                debug!(projects = registry.len(), "Scheduled refresh");
                registry.refresh_all().await;
            }
        }
    }
}
