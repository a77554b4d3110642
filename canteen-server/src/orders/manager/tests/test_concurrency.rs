use super::*;
use std::collections::{HashMap, HashSet};
use std::sync::Barrier;

#[test]
fn test_concurrent_confirm_and_cancel_one_wins() {
    for _ in 0..20 {
        let (manager, _hub) = create_test_manager();
        add_staff(&manager, "s-1");
        let order = place(&manager, "u-1", PaymentMethod::Upi);
        let barrier = Barrier::new(2);

        let (confirm_result, cancel_result) = std::thread::scope(|scope| {
            let confirm = scope.spawn(|| {
                barrier.wait();
                manager.apply_status_transition(
                    &order.order_id,
                    OrderStatus::Confirmed,
                    &admin(),
                    TransitionOptions {
                        expected_status: Some(OrderStatus::Pending),
                        ..Default::default()
                    },
                )
            });
            let cancel = scope.spawn(|| {
                barrier.wait();
                manager.apply_status_transition(
                    &order.order_id,
                    OrderStatus::Cancelled,
                    &user("u-1"),
                    TransitionOptions {
                        expected_status: Some(OrderStatus::Pending),
                        ..Default::default()
                    },
                )
            });
            (confirm.join().unwrap(), cancel.join().unwrap())
        });

        let stored = manager.get_order(&order.order_id).unwrap();
        match (confirm_result, cancel_result) {
            (Ok(confirmed), Err(OrderError::StaleState { actual, .. })) => {
                assert_eq!(stored.status, confirmed.status);
                assert_eq!(actual, confirmed.status);
            }
            (Err(OrderError::StaleState { actual, .. }), Ok(cancelled)) => {
                assert_eq!(stored.status, OrderStatus::Cancelled);
                assert_eq!(actual, cancelled.status);
            }
            other => panic!("expected exactly one winner, got {:?}", other),
        }
        // one status change on top of the creation write
        assert_eq!(stored.revision, 2);
    }
}

#[test]
fn test_concurrent_sweeps_never_double_assign() {
    let (manager, _hub) = create_test_manager();
    let mut order_ids = Vec::new();
    for i in 0..8 {
        let order = place(&manager, &format!("u-{}", i), PaymentMethod::Upi);
        confirm(&manager, &order.order_id);
        order_ids.push(order.order_id);
    }
    add_staff(&manager, "s-1");
    add_staff(&manager, "s-2");

    let barrier = Barrier::new(4);
    let outcomes: Vec<SweepOutcome> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    manager.auto_assign_sweep().unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let assigned: usize = outcomes.iter().map(|o| o.assigned_count).sum();
    assert_eq!(assigned, 6);

    let mut per_staff: HashMap<String, usize> = HashMap::new();
    let mut assigned_orders = HashSet::new();
    for order_id in &order_ids {
        let order = manager.get_order(order_id).unwrap();
        if let Some(staff_id) = order.delivery_staff_id {
            assert_eq!(order.status, OrderStatus::Delivering);
            *per_staff.entry(staff_id).or_insert(0) += 1;
            assigned_orders.insert(order.order_id);
        }
    }
    assert_eq!(assigned_orders.len(), 6);
    assert!(per_staff.values().all(|&load| load <= 3));

    // every courier got exactly one notification per assigned order
    let notified: usize = ["s-1", "s-2"]
        .iter()
        .map(|s| notifications_for(&manager, s).len())
        .sum();
    assert_eq!(notified, 6);
}

#[test]
fn test_concurrent_confirms_respect_cap() {
    let (manager, _hub) = create_test_manager();
    add_staff(&manager, "s-1");
    add_staff(&manager, "s-2");
    let orders: Vec<_> = (0..10)
        .map(|i| place(&manager, &format!("u-{}", i), PaymentMethod::Upi))
        .collect();

    let barrier = Barrier::new(orders.len());
    std::thread::scope(|scope| {
        for order in &orders {
            let manager = manager.clone();
            let barrier = &barrier;
            scope.spawn(move || {
                barrier.wait();
                manager
                    .apply_status_transition(
                        &order.order_id,
                        OrderStatus::Confirmed,
                        &admin(),
                        TransitionOptions::default(),
                    )
                    .unwrap();
            });
        }
    });

    let all = manager.storage().all_orders().unwrap();
    let delivering = all
        .iter()
        .filter(|o| o.status == OrderStatus::Delivering)
        .count();
    let waiting = all
        .iter()
        .filter(|o| o.status == OrderStatus::Confirmed)
        .count();
    assert_eq!(delivering, 6);
    assert_eq!(waiting, 4);
    for staff_id in ["s-1", "s-2"] {
        assert_eq!(manager.list_orders_for_staff(staff_id).unwrap().len(), 3);
    }
}
