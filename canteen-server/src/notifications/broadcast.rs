//! System announcements
//!
//! One `system_announcement` record per recipient, written in a single
//! transaction, followed by a `broadcast` push to each recipient's room.

use shared::message::PushEvent;
use shared::notification::{ChannelFlags, NotificationData, NotificationType, Priority};
use std::sync::Arc;

use super::error::NotificationResult;
use super::ledger::{NotificationDraft, NotificationLedger};
use crate::realtime::FanoutRouter;

/// Record and push an announcement; returns the number of records written
pub fn broadcast_announcement(
    ledger: &NotificationLedger,
    router: &dyn FanoutRouter,
    recipients: &[String],
    title: &str,
    message: &str,
    priority: Priority,
) -> NotificationResult<usize> {
    let drafts: Vec<_> = recipients
        .iter()
        .map(|recipient_id| NotificationDraft {
            recipient_id: recipient_id.clone(),
            kind: NotificationType::SystemAnnouncement,
            title: title.to_string(),
            message: message.to_string(),
            data: NotificationData::default(),
            priority,
            channels: ChannelFlags::in_app_and_push(),
            scheduled_for: None,
            expires_at: None,
        })
        .collect();
    let recorded = ledger.record_many(drafts)?;

    let event = Arc::new(PushEvent::Broadcast {
        title: title.to_string(),
        message: message.to_string(),
    });
    for recipient_id in recipients {
        router.push_to_user(recipient_id, event.clone());
    }

    tracing::info!(recipients = recorded, title, "Announcement broadcast");
    Ok(recorded)
}
