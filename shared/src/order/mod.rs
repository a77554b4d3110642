//! Order model
//!
//! - Snapshots: the persisted order record pushed to clients
//! - Types: line items, payment, rating and actor identities
//! - Events: kinds of change announced over realtime channels

pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use event::OrderEventKind;
pub use snapshot::{OrderSnapshot, OrderStatus, UnknownStatus};
pub use types::*;
