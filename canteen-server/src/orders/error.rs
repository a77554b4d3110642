use shared::order::OrderStatus;
use thiserror::Error;

use crate::db::StorageError;
use crate::staff::StaffError;
use crate::utils::{AppError, ErrorCode};

/// Order engine errors
///
/// Every rejection leaves the stored order untouched.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Transition from {from} to {to} is not allowed")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Payment proof is required before completing a COD delivery")]
    PaymentProofRequired,

    #[error("Order has already been rated")]
    AlreadyRated,

    #[error("Delivery staff not available: {0}")]
    AssignmentUnavailable(String),

    #[error("Order status is {actual}, expected {expected}")]
    StaleState {
        expected: OrderStatus,
        actual: OrderStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<redb::TableError> for OrderError {
    fn from(e: redb::TableError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::StorageError> for OrderError {
    fn from(e: redb::StorageError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::TransactionError> for OrderError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<redb::CommitError> for OrderError {
    fn from(e: redb::CommitError) -> Self {
        Self::Storage(e.into())
    }
}

impl From<StaffError> for OrderError {
    fn from(e: StaffError) -> Self {
        match e {
            StaffError::NotFound(id) => Self::AssignmentUnavailable(id),
            StaffError::Validation(msg) => Self::Validation(msg),
            StaffError::Storage(e) => Self::Storage(e),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => {
                AppError::new(ErrorCode::OrderNotFound).with_detail("orderId", id)
            }
            OrderError::Forbidden(msg) => AppError::permission_denied(msg),
            e @ OrderError::InvalidTransition { .. } => {
                AppError::with_message(ErrorCode::InvalidTransition, e.to_string())
            }
            OrderError::PaymentProofRequired => AppError::new(ErrorCode::PaymentProofRequired),
            OrderError::AlreadyRated => AppError::new(ErrorCode::OrderAlreadyRated),
            OrderError::AssignmentUnavailable(id) => {
                AppError::new(ErrorCode::AssignmentUnavailable).with_detail("staffId", id)
            }
            OrderError::StaleState { expected, actual } => {
                AppError::new(ErrorCode::StaleOrderState)
                    .with_detail("expected", expected.as_str())
                    .with_detail("actual", actual.as_str())
            }
            OrderError::Validation(msg) => AppError::validation(msg),
            OrderError::Storage(e) => {
                tracing::error!(error = %e, "Storage error occurred");
                AppError::database(e.to_string())
            }
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
