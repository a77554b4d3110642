//! Shared types for the canteen platform
//!
//! Wire-level types used by the server and its clients: order snapshots,
//! notification records, realtime push events and the error code table.

pub mod error;
pub mod message;
pub mod notification;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{PushEvent, Room};
pub use notification::{Notification, NotificationType, Priority};
pub use order::{Actor, ActorRole, OrderSnapshot, OrderStatus};
