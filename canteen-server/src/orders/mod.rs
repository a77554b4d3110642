//! Order core
//!
//! - **transition**: pure `(order, request) → (new order, effects)` functions
//! - **policy**: least-loaded delivery staff selection and greedy sweep
//! - **manager**: OrdersManager, runs transitions in redb write transactions
//!   and dispatches effects after commit
//! - **storage**: redb persistence for orders, order numbers and dish ratings
//! - **dashboard**: read-only rollups over stored orders
//! - **assign_worker**: periodic auto-assignment sweep
//!
//! # Architecture
//!
//! ```text
//! Request → OrdersManager ──▶ transition::plan_* ──▶ Storage (redb)
//!                 │                                      │ commit
//!                 ▼                                      ▼
//!        NotificationLedger ◀──────────────────── effects (after commit)
//!                 │
//!                 ▼
//!           FanoutRouter (user / delivery / admin-pool rooms)
//! ```

pub mod assign_worker;
pub mod dashboard;
pub mod error;
pub mod manager;
pub mod money;
pub mod policy;
pub mod storage;
pub mod transition;

// Re-exports
pub use assign_worker::AutoAssignWorker;
pub use dashboard::{DashboardStats, TimeWindow};
pub use error::{OrderError, OrderResult};
pub use manager::{ManagerSettings, OrdersManager, SweepOutcome, TransitionOptions};
pub use storage::OrderStorage;

// Re-export shared types for convenience
pub use shared::order::{Actor, NewOrder, OrderSnapshot, OrderStatus};
