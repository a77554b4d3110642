//! Order event kinds carried by realtime pushes

use super::snapshot::OrderStatus;
use serde::{Deserialize, Serialize};

/// What happened to an order, as seen by a subscribed client
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    OrderPlaced,
    OrderConfirmed,
    OrderOutForDelivery,
    OrderDelivered,
    OrderCancelled,
    OrderRefunded,
    DeliveryAssigned,
    DeliveryUnassigned,
    PaymentUpdated,
    OrderRated,
}

impl OrderEventKind {
    /// Event describing arrival at `status`
    pub fn for_status(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => Self::OrderPlaced,
            OrderStatus::Confirmed => Self::OrderConfirmed,
            OrderStatus::Delivering => Self::OrderOutForDelivery,
            OrderStatus::Delivered => Self::OrderDelivered,
            OrderStatus::Cancelled => Self::OrderCancelled,
            OrderStatus::Refunded => Self::OrderRefunded,
        }
    }
}
