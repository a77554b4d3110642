//! redb-based notification storage
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `notifications` | `id` | `Notification` | Records |
//! | `notification_index` | `(recipient_id, id)` | `()` | Per-recipient lookup |
//!
//! Bulk operations (mark all read, delete all, retention sweep) each run in
//! a single write transaction, so a concurrent second run sees the result
//! of the first and finds nothing left to do.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::notification::Notification;
use std::sync::Arc;

use super::error::{NotificationError, NotificationResult};
use crate::db::{StorageResult, decode, encode};

/// key = notification id, value = JSON-serialized Notification
const NOTIFICATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("notifications");

/// key = (recipient_id, notification id), value = empty (existence index)
const RECIPIENT_INDEX_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("notification_index");

#[derive(Clone)]
pub struct NotificationStorage {
    db: Arc<Database>,
}

impl NotificationStorage {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(NOTIFICATIONS_TABLE)?;
            let _ = txn.open_table(RECIPIENT_INDEX_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    pub fn insert(&self, notification: &Notification) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let bytes = encode(notification)?;
            table.insert(notification.id.as_str(), bytes.as_slice())?;

            let mut index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
            index.insert(
                (notification.recipient_id.as_str(), notification.id.as_str()),
                (),
            )?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Insert many records in one transaction
    pub fn insert_many(&self, notifications: &[Notification]) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let mut index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
            for notification in notifications {
                let bytes = encode(notification)?;
                table.insert(notification.id.as_str(), bytes.as_slice())?;
                index.insert(
                    (notification.recipient_id.as_str(), notification.id.as_str()),
                    (),
                )?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> StorageResult<Option<Notification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(NOTIFICATIONS_TABLE)?;
        table.get(id)?.map(|guard| decode(guard.value())).transpose()
    }

    /// Load, check ownership, modify and store one record atomically
    pub fn update_owned<F>(
        &self,
        id: &str,
        recipient_id: &str,
        update: F,
    ) -> NotificationResult<Notification>
    where
        F: FnOnce(&mut Notification),
    {
        let txn = self.db.begin_write()?;
        let mut notification = Self::load_owned(&txn, id, recipient_id)?;
        update(&mut notification);
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let bytes = encode(&notification)?;
            table.insert(id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(notification)
    }

    /// Modify one record regardless of recipient (channel bookkeeping)
    pub fn update<F>(&self, id: &str, update: F) -> NotificationResult<Notification>
    where
        F: FnOnce(&mut Notification),
    {
        let txn = self.db.begin_write()?;
        let mut notification = Self::load(&txn, id)?;
        update(&mut notification);
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let bytes = encode(&notification)?;
            table.insert(id, bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(notification)
    }

    pub fn delete_owned(&self, id: &str, recipient_id: &str) -> NotificationResult<()> {
        let txn = self.db.begin_write()?;
        Self::load_owned(&txn, id, recipient_id)?;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            table.remove(id)?;
            let mut index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
            index.remove((recipient_id, id))?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Every record addressed to `recipient_id`, unordered
    pub fn list_for(&self, recipient_id: &str) -> StorageResult<Vec<Notification>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(RECIPIENT_INDEX_TABLE)?;
        let table = read_txn.open_table(NOTIFICATIONS_TABLE)?;

        let mut notifications = Vec::new();
        for entry in index.range((recipient_id, "")..)? {
            let (key, _) = entry?;
            let (recipient, id) = key.value();
            if recipient != recipient_id {
                break;
            }
            if let Some(guard) = table.get(id)? {
                notifications.push(decode(guard.value())?);
            }
        }
        Ok(notifications)
    }

    /// Apply `update` to every record of `recipient_id` matching `filter`
    ///
    /// Returns the number of records changed.
    pub fn update_all_for<P, F>(
        &self,
        recipient_id: &str,
        filter: P,
        mut update: F,
    ) -> StorageResult<usize>
    where
        P: Fn(&Notification) -> bool,
        F: FnMut(&mut Notification),
    {
        let txn = self.db.begin_write()?;
        let ids = Self::ids_for(&txn, recipient_id)?;
        let mut changed = 0;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            for id in &ids {
                let existing: Option<Notification> = match table.get(id.as_str())? {
                    Some(guard) => Some(decode(guard.value())?),
                    None => None,
                };
                let Some(mut notification) = existing else {
                    continue;
                };
                if !filter(&notification) {
                    continue;
                }
                update(&mut notification);
                let bytes = encode(&notification)?;
                table.insert(id.as_str(), bytes.as_slice())?;
                changed += 1;
            }
        }
        txn.commit()?;
        Ok(changed)
    }

    pub fn delete_all_for(&self, recipient_id: &str) -> StorageResult<usize> {
        let txn = self.db.begin_write()?;
        let ids = Self::ids_for(&txn, recipient_id)?;
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let mut index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
            for id in &ids {
                table.remove(id.as_str())?;
                index.remove((recipient_id, id.as_str()))?;
            }
        }
        txn.commit()?;
        Ok(ids.len())
    }

    /// Delete every record matching `predicate`, across all recipients
    pub fn delete_where<P>(&self, predicate: P) -> StorageResult<usize>
    where
        P: Fn(&Notification) -> bool,
    {
        let txn = self.db.begin_write()?;
        let doomed: Vec<(String, String)> = {
            let table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let mut doomed = Vec::new();
            for entry in table.iter()? {
                let (_, value) = entry?;
                let notification: Notification = decode(value.value())?;
                if predicate(&notification) {
                    doomed.push((notification.recipient_id, notification.id));
                }
            }
            doomed
        };
        {
            let mut table = txn.open_table(NOTIFICATIONS_TABLE)?;
            let mut index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
            for (recipient_id, id) in &doomed {
                table.remove(id.as_str())?;
                index.remove((recipient_id.as_str(), id.as_str()))?;
            }
        }
        txn.commit()?;
        Ok(doomed.len())
    }

    fn ids_for(txn: &WriteTransaction, recipient_id: &str) -> StorageResult<Vec<String>> {
        let index = txn.open_table(RECIPIENT_INDEX_TABLE)?;
        let mut ids = Vec::new();
        for entry in index.range((recipient_id, "")..)? {
            let (key, _) = entry?;
            let (recipient, id) = key.value();
            if recipient != recipient_id {
                break;
            }
            ids.push(id.to_string());
        }
        Ok(ids)
    }

    fn load(txn: &WriteTransaction, id: &str) -> NotificationResult<Notification> {
        let table = txn.open_table(NOTIFICATIONS_TABLE)?;
        let notification = match table.get(id)? {
            Some(guard) => decode(guard.value())?,
            None => return Err(NotificationError::NotFound(id.to_string())),
        };
        Ok(notification)
    }

    fn load_owned(
        txn: &WriteTransaction,
        id: &str,
        recipient_id: &str,
    ) -> NotificationResult<Notification> {
        let notification = Self::load(txn, id)?;
        if notification.recipient_id != recipient_id {
            return Err(NotificationError::Forbidden(id.to_string()));
        }
        Ok(notification)
    }
}
