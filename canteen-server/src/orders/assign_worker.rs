//! Auto-assign worker
//!
//! Periodically sweeps confirmed orders without delivery staff and
//! assigns them by least load.
//!
//! Registered as `TaskKind::Periodic` by `start_background_tasks()`.
//! Not registered when the interval is 0.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::manager::{OrdersManager, SweepOutcome};

/// Auto-assign scheduler
pub struct AutoAssignWorker {
    manager: OrdersManager,
    interval: Duration,
    shutdown: CancellationToken,
}

impl AutoAssignWorker {
    pub fn new(manager: OrdersManager, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            manager,
            interval,
            shutdown,
        }
    }

    /// Main loop: sweep once immediately, then on every tick
    pub async fn run(self) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Auto-assign worker started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Auto-assign worker received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Run one sweep; storage errors are only logged
    pub fn sweep_once(&self) -> SweepOutcome {
        match self.manager.auto_assign_sweep() {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Auto-assign sweep failed");
                SweepOutcome::default()
            }
        }
    }
}
