//! Staff directory
//!
//! Minimal identity records the assignment policy needs: role, active flag
//! and availability. Stored in the `staff` table keyed by staff ID, so
//! candidate iteration order is stable (ascending ID).

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use shared::order::ActorRole;
use std::sync::Arc;
use thiserror::Error;

use crate::db::{StorageError, StorageResult, decode, encode};
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

/// key = staff_id, value = JSON-serialized StaffMember
const STAFF_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("staff");

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: String,
    pub name: String,
    pub role: ActorRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool {
    true
}

impl StaffMember {
    pub fn delivery(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: ActorRole::Delivery,
            is_active: true,
            is_available: true,
        }
    }

    /// Eligible for new delivery assignments
    pub fn is_assignable(&self) -> bool {
        self.role == ActorRole::Delivery && self.is_active && self.is_available
    }
}

#[derive(Debug, Error)]
pub enum StaffError {
    #[error("Staff member not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<redb::TableError> for StaffError {
    fn from(e: redb::TableError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::StorageError> for StaffError {
    fn from(e: redb::StorageError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::TransactionError> for StaffError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::CommitError> for StaffError {
    fn from(e: redb::CommitError) -> Self {
        Self::Storage(e.into())
    }
}

pub type StaffResult<T> = Result<T, StaffError>;

#[derive(Clone)]
pub struct StaffRepository {
    db: Arc<Database>,
}

impl StaffRepository {
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let txn = db.begin_write()?;
        {
            let _ = txn.open_table(STAFF_TABLE)?;
        }
        txn.commit()?;
        Ok(Self { db })
    }

    /// Insert or replace a staff record
    pub fn upsert(&self, member: &StaffMember) -> StaffResult<()> {
        validate_required_text(&member.id, "id", MAX_NAME_LEN).map_err(StaffError::Validation)?;
        validate_required_text(&member.name, "name", MAX_NAME_LEN)
            .map_err(StaffError::Validation)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(STAFF_TABLE)?;
            let bytes = encode(member)?;
            table.insert(member.id.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        tracing::debug!(staff_id = %member.id, role = %member.role, "Staff record saved");
        Ok(())
    }

    /// Toggle availability (shift start/end, break)
    pub fn set_availability(&self, staff_id: &str, available: bool) -> StaffResult<StaffMember> {
        let txn = self.db.begin_write()?;
        let member = {
            let mut table = txn.open_table(STAFF_TABLE)?;
            let mut member: StaffMember = match table.get(staff_id)? {
                Some(guard) => decode(guard.value())?,
                None => return Err(StaffError::NotFound(staff_id.to_string())),
            };
            member.is_available = available;
            let bytes = encode(&member)?;
            table.insert(staff_id, bytes.as_slice())?;
            member
        };
        txn.commit()?;
        tracing::info!(staff_id = %staff_id, available, "Staff availability changed");
        Ok(member)
    }

    pub fn get(&self, staff_id: &str) -> StorageResult<Option<StaffMember>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF_TABLE)?;
        table
            .get(staff_id)?
            .map(|guard| decode(guard.value()))
            .transpose()
    }

    pub fn list(&self) -> StorageResult<Vec<StaffMember>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STAFF_TABLE)?;
        let mut members = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            members.push(decode(value.value())?);
        }
        Ok(members)
    }

    // ========== Transaction-scoped reads (used by the order engine) ==========

    pub fn get_txn(
        &self,
        txn: &WriteTransaction,
        staff_id: &str,
    ) -> StorageResult<Option<StaffMember>> {
        let table = txn.open_table(STAFF_TABLE)?;
        table
            .get(staff_id)?
            .map(|guard| decode(guard.value()))
            .transpose()
    }

    /// Assignable delivery staff, ascending by ID
    pub fn candidates_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<StaffMember>> {
        let table = txn.open_table(STAFF_TABLE)?;
        let mut candidates = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let member: StaffMember = decode(value.value())?;
            if member.is_assignable() {
                candidates.push(member);
            }
        }
        Ok(candidates)
    }
}
