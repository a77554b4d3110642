//! Notification records
//!
//! A notification is an in-app message addressed to exactly one recipient.
//! The type set is closed: an unknown type string fails to parse.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::order::OrderStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    OrderPlaced,
    OrderConfirmed,
    OrderPreparing,
    OrderReady,
    OrderOutForDelivery,
    OrderDelivered,
    OrderCancelled,
    PaymentSuccess,
    PaymentFailed,
    PaymentRefunded,
    DeliveryAssigned,
    SystemAnnouncement,
    MenuUpdate,
    Promotional,
}

impl NotificationType {
    pub const ALL: [NotificationType; 14] = [
        Self::OrderPlaced,
        Self::OrderConfirmed,
        Self::OrderPreparing,
        Self::OrderReady,
        Self::OrderOutForDelivery,
        Self::OrderDelivered,
        Self::OrderCancelled,
        Self::PaymentSuccess,
        Self::PaymentFailed,
        Self::PaymentRefunded,
        Self::DeliveryAssigned,
        Self::SystemAnnouncement,
        Self::MenuUpdate,
        Self::Promotional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::OrderConfirmed => "order_confirmed",
            Self::OrderPreparing => "order_preparing",
            Self::OrderReady => "order_ready",
            Self::OrderOutForDelivery => "order_out_for_delivery",
            Self::OrderDelivered => "order_delivered",
            Self::OrderCancelled => "order_cancelled",
            Self::PaymentSuccess => "payment_success",
            Self::PaymentFailed => "payment_failed",
            Self::PaymentRefunded => "payment_refunded",
            Self::DeliveryAssigned => "delivery_assigned",
            Self::SystemAnnouncement => "system_announcement",
            Self::MenuUpdate => "menu_update",
            Self::Promotional => "promotional",
        }
    }

    /// Notification sent to the order owner when the order reaches `status`
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => Self::OrderPlaced,
            OrderStatus::Confirmed => Self::OrderConfirmed,
            OrderStatus::Delivering => Self::OrderOutForDelivery,
            OrderStatus::Delivered => Self::OrderDelivered,
            OrderStatus::Cancelled => Self::OrderCancelled,
            OrderStatus::Refunded => Self::PaymentRefunded,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type: {0}")]
pub struct UnknownNotificationType(pub String);

impl FromStr for NotificationType {
    type Err = UnknownNotificationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownNotificationType(s.to_string()))
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Delivery channel of a notification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    InApp,
    Email,
    Sms,
    Push,
}

/// Per-channel flags
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFlags {
    #[serde(default)]
    pub in_app: bool,
    #[serde(default)]
    pub email: bool,
    #[serde(default)]
    pub sms: bool,
    #[serde(default)]
    pub push: bool,
}

impl ChannelFlags {
    /// In-app plus push, the set every order notification requests
    pub fn in_app_and_push() -> Self {
        Self {
            in_app: true,
            push: true,
            ..Self::default()
        }
    }

    pub fn get(&self, channel: Channel) -> bool {
        match channel {
            Channel::InApp => self.in_app,
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::Push => self.push,
        }
    }

    pub fn set(&mut self, channel: Channel, value: bool) {
        match channel {
            Channel::InApp => self.in_app = value,
            Channel::Email => self.email = value,
            Channel::Sms => self.sms = value,
            Channel::Push => self.push = value,
        }
    }
}

/// Structured payload carried by order-related notifications
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Persisted notification record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// ≤ 100 characters
    pub title: String,
    /// ≤ 500 characters
    pub message: String,
    #[serde(default)]
    pub data: NotificationData,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<i64>,
    #[serde(default)]
    pub priority: Priority,
    /// Requested channels
    #[serde(default)]
    pub channels: ChannelFlags,
    /// Channels the message actually went out on
    #[serde(default)]
    pub sent_channels: ChannelFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    pub created_at: i64,
}

impl Notification {
    /// Listed to its recipient at `now`: not scheduled in the future, not expired
    pub fn is_visible_at(&self, now: i64) -> bool {
        self.scheduled_for.is_none_or(|at| at <= now) && self.expires_at.is_none_or(|at| at > now)
    }
}

/// One page of a recipient's notifications, newest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    /// Matching records across all pages
    pub total: usize,
    /// Unread visible records for the recipient, independent of filters
    pub unread_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(now: i64) -> Notification {
        Notification {
            id: "n1".into(),
            recipient_id: "u1".into(),
            kind: NotificationType::OrderPlaced,
            title: "Order Placed".into(),
            message: "ok".into(),
            data: NotificationData::default(),
            is_read: false,
            read_at: None,
            priority: Priority::Medium,
            channels: ChannelFlags::in_app_and_push(),
            sent_channels: ChannelFlags::default(),
            scheduled_for: None,
            expires_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_type_parse_is_closed() {
        assert_eq!(
            "delivery_assigned".parse::<NotificationType>(),
            Ok(NotificationType::DeliveryAssigned)
        );
        assert!("order_teleported".parse::<NotificationType>().is_err());
        assert!(serde_json::from_str::<NotificationType>("\"flash_sale\"").is_err());
    }

    #[test]
    fn test_type_serialized_under_type_key() {
        let json = serde_json::to_value(sample(1)).unwrap();
        assert_eq!(json["type"], "order_placed");
        assert_eq!(json["channels"]["inApp"], true);
        assert_eq!(json["sentChannels"]["push"], false);
    }

    #[test]
    fn test_visibility_window() {
        let mut n = sample(1_000);
        assert!(n.is_visible_at(1_000));

        n.scheduled_for = Some(2_000);
        assert!(!n.is_visible_at(1_500));
        assert!(n.is_visible_at(2_000));

        n.expires_at = Some(3_000);
        assert!(n.is_visible_at(2_999));
        assert!(!n.is_visible_at(3_000));
    }

    #[test]
    fn test_channel_flags_set() {
        let mut flags = ChannelFlags::default();
        flags.set(Channel::Sms, true);
        assert!(flags.get(Channel::Sms));
        assert!(!flags.get(Channel::Email));
    }
}
