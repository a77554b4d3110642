//! Notification ledger
//!
//! # Modules
//!
//! - `storage` - redb persistence (records + recipient index)
//! - `templates` - title / message per notification type
//! - `ledger` - record, page, mark read, delete
//! - `broadcast` - system announcements
//! - `retention` - periodic purge of read notifications

pub mod broadcast;
pub mod error;
pub mod ledger;
pub mod retention;
pub mod storage;
pub mod templates;

pub use broadcast::broadcast_announcement;
pub use error::{NotificationError, NotificationResult};
pub use ledger::{ListQuery, NotificationDraft, NotificationLedger};
pub use retention::RetentionWorker;
pub use storage::NotificationStorage;
