//! Order snapshot - the full persisted order record
//!
//! Every realtime push carries a whole snapshot, never a delta. `revision`
//! increases by one on each persisted change so clients can discard
//! out-of-order pushes.

use super::types::{
    Cancellation, DeliveryLocation, LineItem, PaymentMethod, PaymentStatus, Rating, StatusChange,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order lifecycle status
///
/// ```text
/// pending ──► confirmed ──► delivering ──► delivered
///    │            │              │
///    └────────────┴──────────────┴──► cancelled | refunded
/// ```
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Delivering,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Delivering,
        Self::Delivered,
        Self::Cancelled,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Delivering => "delivering",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Terminal statuses accept no further status change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Statuses reachable in one step.
    ///
    /// This is the whole transition table. `refunded` carries an extra
    /// payment precondition checked by the order engine.
    pub fn allowed_next(&self) -> &'static [OrderStatus] {
        match self {
            Self::Pending => &[Self::Confirmed, Self::Cancelled, Self::Refunded],
            Self::Confirmed => &[Self::Delivering, Self::Cancelled, Self::Refunded],
            Self::Delivering => &[Self::Delivered, Self::Cancelled, Self::Refunded],
            Self::Delivered | Self::Cancelled | Self::Refunded => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Counts toward a delivery staff member's load while assigned
    pub fn is_active_delivery(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Delivering)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// Persisted order record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    /// Opaque order ID
    pub order_id: String,
    /// Human-readable number, unique per business day (`OF<yymmdd><seq>`)
    pub order_number: String,
    /// Owner
    pub user_id: String,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    /// Σ line totals
    pub total_amount: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub discount: f64,
    /// total_amount + tax − discount
    pub final_amount: f64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_proof: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_location: Option<DeliveryLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_staff_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation: Option<Cancellation>,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_delivery_time: Option<i64>,
    /// Incremented on every persisted change
    #[serde(default)]
    pub revision: u64,
}

impl OrderSnapshot {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_cod(&self) -> bool {
        self.payment_method == PaymentMethod::Cod
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    pub fn is_assigned_to(&self, staff_id: &str) -> bool {
        self.delivery_staff_id.as_deref() == Some(staff_id)
    }

    /// Whether this order occupies a delivery slot of its assigned staff
    pub fn counts_toward_load(&self) -> bool {
        self.delivery_staff_id.is_some() && self.status.is_active_delivery()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivering));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(Confirmed.can_transition_to(Delivering));
        assert!(!Confirmed.can_transition_to(Delivered));
        assert!(Delivering.can_transition_to(Delivered));
        assert!(!Delivering.can_transition_to(Confirmed));
        for terminal in [Delivered, Cancelled, Refunded] {
            assert!(terminal.is_terminal());
            assert!(terminal.allowed_next().is_empty());
        }
    }

    #[test]
    fn test_no_edge_back_to_pending() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(OrderStatus::Pending));
        }
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("delivering".parse::<OrderStatus>(), Ok(OrderStatus::Delivering));
        assert_eq!(
            "shipped".parse::<OrderStatus>(),
            Err(UnknownStatus("shipped".into()))
        );
        assert_eq!(
            serde_json::to_string(&OrderStatus::Refunded).unwrap(),
            "\"refunded\""
        );
    }
}
