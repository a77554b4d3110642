//! Order building blocks shared by snapshots and requests

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Actor
// ============================================================================

/// Role of the party performing an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    User,
    Delivery,
    Admin,
    System,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Delivery => "delivery",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated identity performing an operation
///
/// `System` is used by background workers (auto-assignment, retention).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    User(String),
    #[serde(rename = "delivery")]
    DeliveryStaff(String),
    Admin(String),
    System,
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Self::User(_) => ActorRole::User,
            Self::DeliveryStaff(_) => ActorRole::Delivery,
            Self::Admin(_) => ActorRole::Admin,
            Self::System => ActorRole::System,
        }
    }

    /// Identity string, `None` for the system actor
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::User(id) | Self::DeliveryStaff(id) | Self::Admin(id) => Some(id),
            Self::System => None,
        }
    }

    /// Admin or system: may drive any legal transition
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin(_) | Self::System)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}:{}", self.role(), id),
            None => f.write_str("system"),
        }
    }
}

// ============================================================================
// Payment
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Upi,
    Cod,
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "upi",
            Self::Cod => "cod",
            Self::Card => "card",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Result reported by a payment provider for a non-COD order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

// ============================================================================
// Line items
// ============================================================================

/// Dish line inside an order, frozen at order time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub dish_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    /// price × quantity
    pub line_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
}

/// Where in the office the order goes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLocation {
    pub building: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desk: Option<String>,
}

impl fmt::Display for DeliveryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.building)?;
        if let Some(floor) = &self.floor {
            write!(f, ", floor {}", floor)?;
        }
        if let Some(desk) = &self.desk {
            write!(f, ", desk {}", desk)?;
        }
        Ok(())
    }
}

// ============================================================================
// Rating / cancellation / history
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    /// 1..=5
    pub stars: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub rated_at: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancelledBy {
    User,
    Admin,
    System,
}

impl CancelledBy {
    /// Delivery staff never cancel orders, so they have no mapping.
    pub fn from_role(role: ActorRole) -> Option<Self> {
        match role {
            ActorRole::User => Some(Self::User),
            ActorRole::Admin => Some(Self::Admin),
            ActorRole::System => Some(Self::System),
            ActorRole::Delivery => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub cancelled_by: CancelledBy,
    pub cancelled_at: i64,
}

/// Audit entry appended on every status change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: super::OrderStatus,
    pub changed_by: ActorRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub changed_at: i64,
}

// ============================================================================
// Requests
// ============================================================================

/// Line item as submitted by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub dish_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(default)]
    pub special_instructions: Option<String>,
}

/// Order placement request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<NewLineItem>,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub discount: f64,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub delivery_location: Option<DeliveryLocation>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_wire_format() {
        let json = serde_json::to_value(Actor::DeliveryStaff("s-1".into())).unwrap();
        assert_eq!(json, serde_json::json!({"role": "delivery", "id": "s-1"}));

        let json = serde_json::to_value(Actor::System).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system"}));

        let actor: Actor = serde_json::from_str(r#"{"role":"user","id":"u-9"}"#).unwrap();
        assert_eq!(actor, Actor::User("u-9".into()));
        assert_eq!(actor.role(), ActorRole::User);
        assert_eq!(actor.id(), Some("u-9"));
    }

    #[test]
    fn test_cancelled_by_mapping() {
        assert_eq!(
            CancelledBy::from_role(ActorRole::User),
            Some(CancelledBy::User)
        );
        assert_eq!(CancelledBy::from_role(ActorRole::Delivery), None);
    }

    #[test]
    fn test_delivery_location_display() {
        let loc = DeliveryLocation {
            building: "Tower B".into(),
            floor: Some("7".into()),
            desk: None,
        };
        assert_eq!(loc.to_string(), "Tower B, floor 7");
    }

    #[test]
    fn test_new_order_defaults() {
        let order: NewOrder = serde_json::from_str(
            r#"{"items":[{"dishId":"d1","name":"Thali","price":120.0,"quantity":1}],"paymentMethod":"cod"}"#,
        )
        .unwrap();
        assert_eq!(order.tax, 0.0);
        assert_eq!(order.payment_method, PaymentMethod::Cod);
        assert!(order.items[0].special_instructions.is_none());
    }
}
