//! Realtime fan-out
//!
//! ```text
//! OrdersManager ──▶ FanoutRouter::push(room, event)
//!                          │
//!            ┌─────────────┼──────────────┐
//!            ▼             ▼              ▼
//!       user:<id>    delivery:<id>    admin-pool
//! ```
//!
//! The router is handed to the manager at construction; the manager never
//! reaches for a global connection handle. Delivery is best-effort and
//! at-most-once: pushing to an empty room does nothing.

mod hub;

pub use hub::{DEFAULT_SESSION_BUFFER, RoomHub, Session};

use shared::message::{PushEvent, Room};
use std::sync::Arc;

/// Push capability injected into the order core
pub trait FanoutRouter: Send + Sync {
    /// Deliver `event` to every session in `room`; never blocks
    fn push(&self, room: &Room, event: Arc<PushEvent>);

    fn push_to_user(&self, user_id: &str, event: Arc<PushEvent>) {
        self.push(&Room::User(user_id.to_string()), event);
    }

    fn push_to_staff(&self, staff_id: &str, event: Arc<PushEvent>) {
        self.push(&Room::Delivery(staff_id.to_string()), event);
    }

    fn push_to_admin_pool(&self, event: Arc<PushEvent>) {
        self.push(&Room::AdminPool, event);
    }
}
