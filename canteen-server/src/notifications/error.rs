use thiserror::Error;

use crate::db::StorageError;
use crate::utils::{AppError, ErrorCode};

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Notification not found: {0}")]
    NotFound(String),

    #[error("Notification {0} belongs to another recipient")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<redb::TableError> for NotificationError {
    fn from(e: redb::TableError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::StorageError> for NotificationError {
    fn from(e: redb::StorageError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::TransactionError> for NotificationError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::CommitError> for NotificationError {
    fn from(e: redb::CommitError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<NotificationError> for AppError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::NotFound(id) => {
                AppError::new(ErrorCode::NotificationNotFound).with_detail("notificationId", id)
            }
            e @ NotificationError::Forbidden(_) => AppError::permission_denied(e.to_string()),
            NotificationError::Validation(msg) => AppError::validation(msg),
            NotificationError::Storage(e) => {
                tracing::error!(error = %e, "Notification storage error");
                AppError::database(e.to_string())
            }
        }
    }
}

pub type NotificationResult<T> = Result<T, NotificationError>;
