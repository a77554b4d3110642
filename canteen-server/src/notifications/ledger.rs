//! Notification ledger
//!
//! Records, lists and mutates notifications. Reads and writes are scoped to
//! the requesting recipient: touching someone else's record is `Forbidden`.

use shared::notification::{
    Channel, ChannelFlags, Notification, NotificationData, NotificationPage, NotificationType,
    Priority,
};
use shared::util::{new_id, now_millis};
use std::time::Duration;

use super::error::{NotificationError, NotificationResult};
use super::storage::NotificationStorage;
use super::templates::{self, TemplateContext};
use crate::utils::validation::{
    MAX_MESSAGE_LEN, MAX_NAME_LEN, MAX_TITLE_LEN, validate_required_text,
};

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest page a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// A notification about to be recorded
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub recipient_id: String,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub data: NotificationData,
    pub priority: Priority,
    pub channels: ChannelFlags,
    pub scheduled_for: Option<i64>,
    pub expires_at: Option<i64>,
}

impl NotificationDraft {
    /// Draft rendered from the type's template
    pub fn from_template(
        recipient_id: impl Into<String>,
        kind: NotificationType,
        data: NotificationData,
    ) -> Self {
        let rendered = templates::render(
            kind,
            TemplateContext {
                order_number: data.order_number.as_deref(),
                amount: data.amount,
            },
        );
        Self {
            recipient_id: recipient_id.into(),
            kind,
            title: rendered.title,
            message: rendered.message,
            data,
            priority: rendered.priority,
            channels: ChannelFlags::in_app_and_push(),
            scheduled_for: None,
            expires_at: None,
        }
    }

    fn validate(&self) -> NotificationResult<()> {
        validate_required_text(&self.recipient_id, "recipientId", MAX_NAME_LEN)
            .map_err(NotificationError::Validation)?;
        validate_required_text(&self.title, "title", MAX_TITLE_LEN)
            .map_err(NotificationError::Validation)?;
        validate_required_text(&self.message, "message", MAX_MESSAGE_LEN)
            .map_err(NotificationError::Validation)?;
        if let (Some(scheduled), Some(expires)) = (self.scheduled_for, self.expires_at)
            && expires <= scheduled
        {
            return Err(NotificationError::Validation(
                "expiresAt must be after scheduledFor".into(),
            ));
        }
        Ok(())
    }

    fn into_notification(self, now: i64) -> Notification {
        Notification {
            id: new_id(),
            recipient_id: self.recipient_id,
            kind: self.kind,
            title: self.title,
            message: self.message,
            data: self.data,
            is_read: false,
            read_at: None,
            priority: self.priority,
            channels: self.channels,
            sent_channels: ChannelFlags::default(),
            scheduled_for: self.scheduled_for,
            expires_at: self.expires_at,
            created_at: now,
        }
    }
}

/// Listing options
#[derive(Debug, Clone, Copy)]
pub struct ListQuery {
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    pub unread_only: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            unread_only: false,
        }
    }
}

#[derive(Clone)]
pub struct NotificationLedger {
    storage: NotificationStorage,
}

impl NotificationLedger {
    pub fn new(storage: NotificationStorage) -> Self {
        Self { storage }
    }

    /// Validate and persist a draft
    pub fn record(&self, draft: NotificationDraft) -> NotificationResult<Notification> {
        draft.validate()?;
        let notification = draft.into_notification(now_millis());
        self.storage.insert(&notification)?;
        tracing::debug!(
            notification_id = %notification.id,
            recipient_id = %notification.recipient_id,
            kind = %notification.kind,
            "Notification recorded"
        );
        Ok(notification)
    }

    /// Validate and persist several drafts in one transaction
    ///
    /// Nothing is written if any draft is invalid.
    pub fn record_many(&self, drafts: Vec<NotificationDraft>) -> NotificationResult<usize> {
        for draft in &drafts {
            draft.validate()?;
        }
        let now = now_millis();
        let notifications: Vec<_> = drafts
            .into_iter()
            .map(|draft| draft.into_notification(now))
            .collect();
        self.storage.insert_many(&notifications)?;
        Ok(notifications.len())
    }

    /// Record the templated notification for an order event
    pub fn record_order_event(
        &self,
        recipient_id: &str,
        kind: NotificationType,
        data: NotificationData,
    ) -> NotificationResult<Notification> {
        self.record(NotificationDraft::from_template(recipient_id, kind, data))
    }

    /// Page through a recipient's visible notifications, newest first
    pub fn list(&self, recipient_id: &str, query: ListQuery) -> NotificationResult<NotificationPage> {
        let page = query.page.max(1);
        let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
        let now = now_millis();

        let mut visible: Vec<_> = self
            .storage
            .list_for(recipient_id)?
            .into_iter()
            .filter(|n| n.is_visible_at(now))
            .collect();
        let unread_count = visible.iter().filter(|n| !n.is_read).count();
        if query.unread_only {
            visible.retain(|n| !n.is_read);
        }
        visible.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = visible.len();
        let items: Vec<_> = visible
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        let has_more = page * page_size < total;

        Ok(NotificationPage {
            items,
            total,
            unread_count,
            page,
            page_size,
            has_more,
        })
    }

    /// Unread, currently visible notifications
    pub fn unread_count(&self, recipient_id: &str) -> NotificationResult<usize> {
        let now = now_millis();
        Ok(self
            .storage
            .list_for(recipient_id)?
            .iter()
            .filter(|n| !n.is_read && n.is_visible_at(now))
            .count())
    }

    /// Mark one notification read; repeating the call keeps the first `readAt`
    pub fn mark_read(&self, id: &str, recipient_id: &str) -> NotificationResult<Notification> {
        let now = now_millis();
        self.storage.update_owned(id, recipient_id, |n| {
            if !n.is_read {
                n.is_read = true;
                n.read_at = Some(now);
            }
        })
    }

    /// Mark every unread notification of the recipient read
    pub fn mark_all_read(&self, recipient_id: &str) -> NotificationResult<usize> {
        let now = now_millis();
        let changed = self.storage.update_all_for(
            recipient_id,
            |n| !n.is_read,
            |n| {
                n.is_read = true;
                n.read_at = Some(now);
            },
        )?;
        Ok(changed)
    }

    pub fn delete_one(&self, id: &str, recipient_id: &str) -> NotificationResult<()> {
        self.storage.delete_owned(id, recipient_id)
    }

    pub fn delete_all(&self, recipient_id: &str) -> NotificationResult<usize> {
        Ok(self.storage.delete_all_for(recipient_id)?)
    }

    /// Record that a channel actually delivered the notification
    pub fn mark_sent(&self, id: &str, channel: Channel) -> NotificationResult<Notification> {
        self.storage.update(id, |n| n.sent_channels.set(channel, true))
    }

    /// Delete read notifications created more than `max_age` before `now`
    pub fn purge_read_older_than(&self, max_age: Duration, now: i64) -> NotificationResult<usize> {
        let cutoff = now.saturating_sub(i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX));
        let removed = self
            .storage
            .delete_where(|n| n.is_read && n.created_at < cutoff)?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn ledger() -> NotificationLedger {
        let storage = NotificationStorage::new(open_in_memory().unwrap()).unwrap();
        NotificationLedger::new(storage)
    }

    fn order_data(number: &str) -> NotificationData {
        NotificationData {
            order_id: Some(format!("id-{}", number)),
            order_number: Some(number.to_string()),
            amount: Some(150.0),
            location: None,
        }
    }

    fn seed(ledger: &NotificationLedger, recipient: &str, count: usize) -> Vec<Notification> {
        (0..count)
            .map(|i| {
                ledger
                    .record_order_event(
                        recipient,
                        NotificationType::OrderPlaced,
                        order_data(&format!("OF26101800{}", i)),
                    )
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_record_order_event_uses_template() {
        let ledger = ledger();
        let n = ledger
            .record_order_event("u-1", NotificationType::OrderConfirmed, order_data("OF261018001"))
            .unwrap();
        assert_eq!(n.title, "Order Confirmed");
        assert!(n.message.contains("OF261018001"));
        assert!(!n.is_read);
        assert!(n.channels.in_app);
        assert!(!n.sent_channels.in_app);
    }

    #[test]
    fn test_record_rejects_long_title() {
        let ledger = ledger();
        let mut draft = NotificationDraft::from_template(
            "u-1",
            NotificationType::SystemAnnouncement,
            NotificationData::default(),
        );
        draft.title = "t".repeat(MAX_TITLE_LEN + 1);
        assert!(matches!(
            ledger.record(draft),
            Err(NotificationError::Validation(_))
        ));
    }

    #[test]
    fn test_list_pagination_and_unread_count() {
        let ledger = ledger();
        seed(&ledger, "u-1", 5);
        seed(&ledger, "u-2", 2);

        let page = ledger
            .list(
                "u-1",
                ListQuery {
                    page: 1,
                    page_size: 2,
                    unread_only: false,
                },
            )
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.unread_count, 5);
        assert!(page.has_more);
        assert!(page.items.iter().all(|n| n.recipient_id == "u-1"));

        let last = ledger
            .list(
                "u-1",
                ListQuery {
                    page: 3,
                    page_size: 2,
                    unread_only: false,
                },
            )
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);
    }

    #[test]
    fn test_list_hides_scheduled_and_expired() {
        let ledger = ledger();
        let now = now_millis();
        let mut future = NotificationDraft::from_template(
            "u-1",
            NotificationType::Promotional,
            NotificationData::default(),
        );
        future.scheduled_for = Some(now + 3_600_000);
        ledger.record(future).unwrap();

        let mut expired = NotificationDraft::from_template(
            "u-1",
            NotificationType::MenuUpdate,
            NotificationData::default(),
        );
        expired.scheduled_for = Some(now - 7_200_000);
        expired.expires_at = Some(now - 3_600_000);
        ledger.record(expired).unwrap();

        seed(&ledger, "u-1", 1);
        let page = ledger.list("u-1", ListQuery::default()).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(ledger.unread_count("u-1").unwrap(), 1);
    }

    #[test]
    fn test_mark_read_is_idempotent() {
        let ledger = ledger();
        let n = seed(&ledger, "u-1", 1).remove(0);

        let first = ledger.mark_read(&n.id, "u-1").unwrap();
        assert!(first.is_read);
        let read_at = first.read_at;
        assert!(read_at.is_some());

        let second = ledger.mark_read(&n.id, "u-1").unwrap();
        assert_eq!(second.read_at, read_at);
        assert_eq!(ledger.unread_count("u-1").unwrap(), 0);
    }

    #[test]
    fn test_foreign_recipient_forbidden() {
        let ledger = ledger();
        let n = seed(&ledger, "u-1", 1).remove(0);
        assert!(matches!(
            ledger.mark_read(&n.id, "u-2"),
            Err(NotificationError::Forbidden(_))
        ));
        assert!(matches!(
            ledger.delete_one(&n.id, "u-2"),
            Err(NotificationError::Forbidden(_))
        ));
        assert!(matches!(
            ledger.mark_read("missing", "u-1"),
            Err(NotificationError::NotFound(_))
        ));
        assert!(!ledger.list("u-1", ListQuery::default()).unwrap().items[0].is_read);
    }

    #[test]
    fn test_mark_all_read_then_unread_filter() {
        let ledger = ledger();
        seed(&ledger, "u-1", 3);
        seed(&ledger, "u-2", 1);
        assert_eq!(ledger.mark_all_read("u-1").unwrap(), 3);
        assert_eq!(ledger.mark_all_read("u-1").unwrap(), 0);

        let unread = ledger
            .list(
                "u-1",
                ListQuery {
                    unread_only: true,
                    ..ListQuery::default()
                },
            )
            .unwrap();
        assert_eq!(unread.total, 0);
        assert_eq!(ledger.unread_count("u-2").unwrap(), 1);
    }

    #[test]
    fn test_delete_one_and_all() {
        let ledger = ledger();
        let mut seeded = seed(&ledger, "u-1", 3);
        seed(&ledger, "u-2", 1);

        let first = seeded.remove(0);
        ledger.delete_one(&first.id, "u-1").unwrap();
        assert!(matches!(
            ledger.delete_one(&first.id, "u-1"),
            Err(NotificationError::NotFound(_))
        ));

        assert_eq!(ledger.delete_all("u-1").unwrap(), 2);
        assert_eq!(ledger.list("u-1", ListQuery::default()).unwrap().total, 0);
        assert_eq!(ledger.list("u-2", ListQuery::default()).unwrap().total, 1);
    }

    #[test]
    fn test_mark_sent() {
        let ledger = ledger();
        let n = seed(&ledger, "u-1", 1).remove(0);
        let updated = ledger.mark_sent(&n.id, Channel::Push).unwrap();
        assert!(updated.sent_channels.push);
        assert!(!updated.sent_channels.email);
    }

    #[test]
    fn test_purge_only_old_read_records() {
        let ledger = ledger();
        let seeded = seed(&ledger, "u-1", 3);
        ledger.mark_read(&seeded[0].id, "u-1").unwrap();
        ledger.mark_read(&seeded[1].id, "u-1").unwrap();

        let now = now_millis();
        let retention = Duration::from_secs(30 * 24 * 3600);
        // nothing is old enough yet
        assert_eq!(ledger.purge_read_older_than(retention, now).unwrap(), 0);

        // 31 days later the two read ones go, the unread one stays
        let later = now + 31 * 24 * 3600 * 1000;
        assert_eq!(ledger.purge_read_older_than(retention, later).unwrap(), 2);
        assert_eq!(ledger.purge_read_older_than(retention, later).unwrap(), 0);
        let remaining = ledger.list("u-1", ListQuery::default()).unwrap();
        assert_eq!(remaining.total, 1);
        assert_eq!(remaining.items[0].id, seeded[2].id);
    }

    #[test]
    fn test_record_many_is_all_or_nothing() {
        let ledger = ledger();
        let good = NotificationDraft::from_template(
            "u-1",
            NotificationType::SystemAnnouncement,
            NotificationData::default(),
        );
        let mut bad = good.clone();
        bad.message = String::new();
        assert!(ledger.record_many(vec![good.clone(), bad]).is_err());
        assert_eq!(ledger.unread_count("u-1").unwrap(), 0);

        assert_eq!(ledger.record_many(vec![good.clone(), good]).unwrap(), 2);
        assert_eq!(ledger.unread_count("u-1").unwrap(), 2);
    }
}
