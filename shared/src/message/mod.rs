//! Realtime push messages
//!
//! Shared between the server's fan-out router and subscribed clients.
//! Order pushes always carry the complete snapshot.

use serde::{Deserialize, Serialize};

use crate::order::{OrderEventKind, OrderSnapshot};

mod room;
pub use room::{InvalidRoom, Room};

/// Event pushed to a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PushEvent {
    /// An order the recipient is involved in changed
    OrderUpdate {
        event_kind: OrderEventKind,
        order: OrderSnapshot,
    },
    /// A new order entered the system (admin pool only)
    NewOrder { order: OrderSnapshot },
    /// Free-form announcement
    Broadcast { title: String, message: String },
}

impl PushEvent {
    /// Client-facing event name
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::OrderUpdate { .. } => "order_update",
            PushEvent::NewOrder { .. } => "new_order",
            PushEvent::Broadcast { .. } => "broadcast",
        }
    }

    /// Order carried by this event, if any
    pub fn order(&self) -> Option<&OrderSnapshot> {
        match self {
            PushEvent::OrderUpdate { order, .. } | PushEvent::NewOrder { order } => Some(order),
            PushEvent::Broadcast { .. } => None,
        }
    }
}
