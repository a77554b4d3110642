//! Notification retention
//!
//! Periodically deletes read notifications older than the retention
//! period. Unread notifications are never purged.
//!
//! Registered as `TaskKind::Periodic` by `start_background_tasks()`.

use shared::util::now_millis;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::ledger::NotificationLedger;

/// Read-notification purge task
pub struct RetentionWorker {
    ledger: NotificationLedger,
    retention: Duration,
    interval: Duration,
    shutdown: CancellationToken,
}

impl RetentionWorker {
    pub fn new(
        ledger: NotificationLedger,
        retention: Duration,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ledger,
            retention,
            interval,
            shutdown,
        }
    }

    /// Main loop: purge once immediately, then on every tick
    pub async fn run(self) {
        tracing::info!(
            retention_days = self.retention.as_secs() / 86_400,
            interval_secs = self.interval.as_secs(),
            "Notification retention worker started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once();
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("Notification retention worker received shutdown signal");
                    break;
                }
            }
        }
    }

    /// Run one purge, returning the number deleted
    pub fn sweep_once(&self) -> usize {
        match self.ledger.purge_read_older_than(self.retention, now_millis()) {
            Ok(0) => 0,
            Ok(removed) => {
                tracing::info!(removed, "Purged read notifications past retention");
                removed
            }
            Err(e) => {
                tracing::error!(error = %e, "Notification retention sweep failed");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::notifications::storage::NotificationStorage;
    use shared::notification::{NotificationData, NotificationType};

    fn ledger() -> NotificationLedger {
        NotificationLedger::new(NotificationStorage::new(open_in_memory().unwrap()).unwrap())
    }

    #[test]
    fn test_sweep_keeps_recent_records() {
        let ledger = ledger();
        let n = ledger
            .record_order_event("u-1", NotificationType::OrderPlaced, NotificationData::default())
            .unwrap();
        ledger.mark_read(&n.id, "u-1").unwrap();

        let worker = RetentionWorker::new(
            ledger.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        assert_eq!(worker.sweep_once(), 0);
    }

    #[test]
    fn test_zero_retention_purges_read_only() {
        let ledger = ledger();
        let read = ledger
            .record_order_event("u-1", NotificationType::OrderPlaced, NotificationData::default())
            .unwrap();
        ledger
            .record_order_event("u-1", NotificationType::OrderConfirmed, NotificationData::default())
            .unwrap();
        ledger.mark_read(&read.id, "u-1").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        let worker = RetentionWorker::new(
            ledger.clone(),
            Duration::ZERO,
            Duration::from_secs(60),
            CancellationToken::new(),
        );
        assert_eq!(worker.sweep_once(), 1);
        assert_eq!(ledger.unread_count("u-1").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let token = CancellationToken::new();
        let worker = RetentionWorker::new(
            ledger(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            token.clone(),
        );
        let handle = tokio::spawn(worker.run());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
