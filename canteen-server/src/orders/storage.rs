//! redb-based storage layer for orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `OrderSnapshot` | Current order records |
//! | `counters` | `"order_seq:<yymmdd>"` | `u64` | Daily order number sequence |
//! | `dish_ratings` | `dish_id` | `DishRating` | Running rating average per dish |
//!
//! Mutations go through a caller-owned `WriteTransaction`: read, check,
//! write, commit. redb serializes writers, so a check done inside the
//! transaction cannot be invalidated before commit.

use chrono::NaiveDate;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::{Deserialize, Serialize};
use shared::order::{OrderSnapshot, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::{StorageResult, decode, encode};

/// key = order_id, value = JSON-serialized OrderSnapshot
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// key = counter name, value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

/// key = dish_id, value = JSON-serialized DishRating
const DISH_RATINGS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("dish_ratings");

/// Order number prefix
const ORDER_NUMBER_PREFIX: &str = "OF";

/// Aggregated rating for one dish
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DishRating {
    pub average: f64,
    pub count: u64,
}

impl DishRating {
    /// Fold one more rating into the running average
    pub fn with_rating(self, stars: u8) -> Self {
        let count = self.count + 1;
        let average = (self.average * self.count as f64 + f64::from(stars)) / count as f64;
        Self { average, count }
    }
}

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(ORDERS_TABLE)?;
            let _ = txn.open_table(COUNTERS_TABLE)?;
            let _ = txn.open_table(DISH_RATINGS_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Order Number ==========

    /// Allocate the next order number for `date` (within transaction)
    ///
    /// Format: `OF` + `yymmdd` + at least three digits, restarting at 001
    /// each business day.
    pub fn next_order_number(&self, txn: &WriteTransaction, date: NaiveDate) -> StorageResult<String> {
        let day = date.format("%y%m%d").to_string();
        let key = format!("order_seq:{}", day);
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        let current = table.get(key.as_str())?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(key.as_str(), next)?;
        Ok(format!("{}{}{:03}", ORDER_NUMBER_PREFIX, day, next))
    }

    // ========== Orders ==========

    /// Store an order snapshot (within transaction)
    pub fn store_order(&self, txn: &WriteTransaction, order: &OrderSnapshot) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let bytes = encode(order)?;
        table.insert(order.order_id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Get an order (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        table
            .get(order_id)?
            .map(|guard| decode(guard.value()))
            .transpose()
    }

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        table
            .get(order_id)?
            .map(|guard| decode(guard.value()))
            .transpose()
    }

    /// Every stored order
    pub fn all_orders(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::with_capacity(table.len()? as usize);
        for entry in table.iter()? {
            let (_, value) = entry?;
            orders.push(decode(value.value())?);
        }
        Ok(orders)
    }

    /// Orders placed by `user_id`, newest first
    pub fn orders_for_user(&self, user_id: &str) -> StorageResult<Vec<OrderSnapshot>> {
        let mut orders: Vec<_> = self
            .all_orders()?
            .into_iter()
            .filter(|order| order.is_owned_by(user_id))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Orders currently assigned to `staff_id`, oldest first
    pub fn orders_for_staff(&self, staff_id: &str) -> StorageResult<Vec<OrderSnapshot>> {
        let mut orders: Vec<_> = self
            .all_orders()?
            .into_iter()
            .filter(|order| order.is_assigned_to(staff_id))
            .collect();
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }

    fn all_orders_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<OrderSnapshot>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let mut orders = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            orders.push(decode(value.value())?);
        }
        Ok(orders)
    }

    /// Active delivery count per staff member (within transaction)
    ///
    /// Counts assigned orders in `confirmed` or `delivering`.
    pub fn staff_loads_txn(&self, txn: &WriteTransaction) -> StorageResult<HashMap<String, usize>> {
        let mut loads = HashMap::new();
        for order in self.all_orders_txn(txn)? {
            if order.counts_toward_load()
                && let Some(staff_id) = order.delivery_staff_id
            {
                *loads.entry(staff_id).or_insert(0) += 1;
            }
        }
        Ok(loads)
    }

    /// Confirmed orders without delivery staff, oldest first (within transaction)
    pub fn unassigned_confirmed_txn(
        &self,
        txn: &WriteTransaction,
    ) -> StorageResult<Vec<OrderSnapshot>> {
        let mut orders: Vec<_> = self
            .all_orders_txn(txn)?
            .into_iter()
            .filter(|o| o.status == OrderStatus::Confirmed && o.delivery_staff_id.is_none())
            .collect();
        orders.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.order_number.cmp(&b.order_number))
        });
        Ok(orders)
    }

    // ========== Dish Ratings ==========

    /// Fold a rating into every listed dish's running average
    pub fn record_dish_ratings(&self, dish_ids: &[String], stars: u8) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(DISH_RATINGS_TABLE)?;
            for dish_id in dish_ids {
                let current: DishRating = match table.get(dish_id.as_str())? {
                    Some(guard) => decode(guard.value())?,
                    None => DishRating::default(),
                };
                let bytes = encode(&current.with_rating(stars))?;
                table.insert(dish_id.as_str(), bytes.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_dish_rating(&self, dish_id: &str) -> StorageResult<Option<DishRating>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DISH_RATINGS_TABLE)?;
        table
            .get(dish_id)?
            .map(|guard| decode(guard.value()))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn storage() -> OrderStorage {
        OrderStorage::new(open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn test_order_number_sequence_resets_daily() {
        let storage = storage();
        let day1 = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let day2 = day1.succ_opt().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_order_number(&txn, day1).unwrap(), "OF261018001");
        assert_eq!(storage.next_order_number(&txn, day1).unwrap(), "OF261018002");
        assert_eq!(storage.next_order_number(&txn, day2).unwrap(), "OF261019001");
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_order_number(&txn, day1).unwrap(), "OF261018003");
    }

    #[test]
    fn test_order_number_rolled_back_with_transaction() {
        let storage = storage();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let txn = storage.begin_write().unwrap();
        storage.next_order_number(&txn, day).unwrap();
        drop(txn);

        let txn = storage.begin_write().unwrap();
        assert_eq!(storage.next_order_number(&txn, day).unwrap(), "OF261018001");
    }

    #[test]
    fn test_order_number_grows_past_three_digits() {
        let storage = storage();
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let txn = storage.begin_write().unwrap();
        let mut last = String::new();
        for _ in 0..1000 {
            last = storage.next_order_number(&txn, day).unwrap();
        }
        assert_eq!(last, "OF2610181000");
    }

    #[test]
    fn test_dish_rating_running_average() {
        let storage = storage();
        let dishes = vec!["dal".to_string(), "roti".to_string()];
        storage.record_dish_ratings(&dishes, 5).unwrap();
        storage.record_dish_ratings(&dishes[..1], 2).unwrap();

        let dal = storage.get_dish_rating("dal").unwrap().unwrap();
        assert_eq!(dal.count, 2);
        assert!((dal.average - 3.5).abs() < f64::EPSILON);

        let roti = storage.get_dish_rating("roti").unwrap().unwrap();
        assert_eq!(roti.count, 1);
        assert!(storage.get_dish_rating("naan").unwrap().is_none());
    }
}
