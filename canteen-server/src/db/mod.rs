//! Database Module
//!
//! One redb file (`<WORK_DIR>/canteen.redb`) holds every table. Each store
//! (orders, staff, notifications) owns its own table definitions and shares
//! the `Arc<Database>` handed out here.

use redb::Database;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Database file name inside the work directory
pub const DATABASE_FILE: &str = "canteen.redb";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Open or create the database at the given path
///
/// redb commits with `Durability::Immediate` by default: once `commit()`
/// returns the change survives a crash.
pub fn open_database(path: impl AsRef<Path>) -> StorageResult<Arc<Database>> {
    let db = Database::create(path)?;
    Ok(Arc::new(db))
}

/// Open an in-memory database
pub fn open_in_memory() -> StorageResult<Arc<Database>> {
    let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
    Ok(Arc::new(db))
}

/// Serialize a record for storage
pub(crate) fn encode<T: serde::Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserialize a stored record
pub(crate) fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(bytes)?)
}
