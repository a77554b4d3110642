use super::*;
use crate::db::open_in_memory;
use crate::notifications::{ListQuery, NotificationStorage};
use crate::realtime::{RoomHub, Session};
use crate::staff::StaffMember;
use shared::notification::{Notification, NotificationType};
use shared::order::{NewLineItem, PaymentMethod, PaymentStatus};

mod test_concurrency;

fn create_test_manager() -> (OrdersManager, RoomHub) {
    create_test_manager_with(ManagerSettings::default())
}

fn create_test_manager_with(settings: ManagerSettings) -> (OrdersManager, RoomHub) {
    let db = open_in_memory().unwrap();
    let storage = OrderStorage::new(db.clone()).unwrap();
    let staff = StaffRepository::new(db.clone()).unwrap();
    let ledger = NotificationLedger::new(NotificationStorage::new(db).unwrap());
    let hub = RoomHub::new(64);
    let manager = OrdersManager::new(storage, staff, ledger, Arc::new(hub.clone()), settings);
    (manager, hub)
}

fn admin() -> Actor {
    Actor::Admin("admin-1".to_string())
}

fn user(id: &str) -> Actor {
    Actor::User(id.to_string())
}

fn courier(id: &str) -> Actor {
    Actor::DeliveryStaff(id.to_string())
}

fn add_staff(manager: &OrdersManager, id: &str) {
    manager
        .staff()
        .upsert(&StaffMember::delivery(id, format!("Courier {}", id)))
        .unwrap();
}

// ========================================================================
// Helper: place an order
// ========================================================================

/// Two thalis (120) and a lassi (30), tax 12 → total 270, final 282
fn simple_order(method: PaymentMethod) -> NewOrder {
    NewOrder {
        items: vec![
            NewLineItem {
                dish_id: "thali".to_string(),
                name: "Veg Thali".to_string(),
                price: 120.0,
                quantity: 2,
                special_instructions: Some("less spicy".to_string()),
            },
            NewLineItem {
                dish_id: "lassi".to_string(),
                name: "Sweet Lassi".to_string(),
                price: 30.0,
                quantity: 1,
                special_instructions: None,
            },
        ],
        tax: 12.0,
        discount: 0.0,
        payment_method: method,
        delivery_location: Some(shared::order::DeliveryLocation {
            building: "Tower B".to_string(),
            floor: Some("4".to_string()),
            desk: Some("4-117".to_string()),
        }),
        notes: None,
    }
}

fn place(manager: &OrdersManager, user_id: &str, method: PaymentMethod) -> OrderSnapshot {
    manager
        .create_order(user_id, simple_order(method))
        .expect("Failed to place order")
}

fn confirm(manager: &OrdersManager, order_id: &str) -> OrderSnapshot {
    manager
        .apply_status_transition(
            order_id,
            OrderStatus::Confirmed,
            &admin(),
            TransitionOptions::default(),
        )
        .expect("Failed to confirm order")
}

fn notifications_for(manager: &OrdersManager, recipient: &str) -> Vec<Notification> {
    manager
        .ledger()
        .list(
            recipient,
            ListQuery {
                page: 1,
                page_size: 100,
                unread_only: false,
            },
        )
        .unwrap()
        .items
}

fn kinds_for(manager: &OrdersManager, recipient: &str) -> Vec<NotificationType> {
    let mut kinds: Vec<_> = notifications_for(manager, recipient)
        .into_iter()
        .map(|n| n.kind)
        .collect();
    kinds.sort_by_key(|k| k.as_str());
    kinds
}

fn drain(session: &mut Session) -> Vec<Arc<PushEvent>> {
    let mut events = Vec::new();
    while let Ok(event) = session.rx.try_recv() {
        events.push(event);
    }
    events
}

fn assert_money_invariant(order: &OrderSnapshot) {
    assert!(
        money::money_eq(order.final_amount, order.total_amount + order.tax - order.discount),
        "final amount drifted: {:?}",
        order
    );
}
