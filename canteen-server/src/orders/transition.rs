//! Pure order transitions
//!
//! Every mutation is a function `(order, request) → (new order, effects)`.
//! Nothing here touches storage, the clock or the network: the manager
//! persists the returned order and only then performs the effects.
//!
//! ```text
//! plan_*(order, request)
//!     ├─ authorize (pure predicate per operation)
//!     ├─ check the edge against OrderStatus::allowed_next
//!     ├─ build the new snapshot (revision + 1)
//!     └─ list effects: owner / staff notifications, room pushes
//! ```

use shared::message::Room;
use shared::notification::NotificationType;
use shared::order::{
    Actor, Cancellation, CancelledBy, DeliveryLocation, LineItem, NewOrder, OrderEventKind,
    OrderSnapshot, OrderStatus, PaymentOutcome, PaymentStatus, Rating, StatusChange,
};

use super::error::{OrderError, OrderResult};
use super::money;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_NOTE_LEN, MAX_URL_LEN, validate_optional_text,
    validate_required_text,
};

/// Work to perform after the new snapshot is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Record a notification for `recipient`
    Notify {
        recipient: String,
        kind: NotificationType,
    },
    /// Push the committed snapshot to `room`
    Push { room: Room, kind: OrderEventKind },
    /// Push the committed snapshot to the admin pool as a new order
    AnnounceNewOrder,
}

/// Planned mutation
#[derive(Debug, Clone)]
pub struct Transition {
    pub order: OrderSnapshot,
    pub effects: Vec<Effect>,
}

/// Staff resolution decided by the caller before planning
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaffChange {
    Keep,
    Assign(String),
    /// Drop the current assignee; the order waits for the sweep
    Release,
}

/// Status change request
#[derive(Debug, Clone)]
pub struct StatusRequest<'a> {
    pub target: OrderStatus,
    pub actor: &'a Actor,
    pub notes: Option<&'a str>,
    pub staff: StaffChange,
    pub now: i64,
}

// ============================================================================
// Authorization
// ============================================================================

/// Who may request a status change
///
/// - admin / system: any legal transition
/// - user: only `cancelled`, only on their own order
/// - delivery staff: only `delivered`, only on an order assigned to them
pub fn authorize_status_change(
    actor: &Actor,
    order: &OrderSnapshot,
    target: OrderStatus,
) -> OrderResult<()> {
    match actor {
        Actor::Admin(_) | Actor::System => Ok(()),
        Actor::User(user_id) => {
            if target != OrderStatus::Cancelled {
                return Err(OrderError::Forbidden(format!(
                    "users cannot move an order to {}",
                    target
                )));
            }
            if !order.is_owned_by(user_id) {
                return Err(OrderError::Forbidden(
                    "order belongs to another user".into(),
                ));
            }
            Ok(())
        }
        Actor::DeliveryStaff(staff_id) => {
            if target != OrderStatus::Delivered {
                return Err(OrderError::Forbidden(format!(
                    "delivery staff cannot move an order to {}",
                    target
                )));
            }
            if !order.is_assigned_to(staff_id) {
                return Err(OrderError::Forbidden(
                    "order is assigned to another staff member".into(),
                ));
            }
            Ok(())
        }
    }
}

/// Edge legality: terminal check, transition table, refund precondition
pub fn check_edge(order: &OrderSnapshot, target: OrderStatus) -> OrderResult<()> {
    if !order.status.can_transition_to(target) {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }
    if target == OrderStatus::Refunded && order.payment_status != PaymentStatus::Completed {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }
    Ok(())
}

// ============================================================================
// Status changes
// ============================================================================

/// Plan a status change
///
/// Entering `confirmed` with staff already resolved continues straight to
/// `delivering`. The owner's notification describes the requested status.
pub fn plan_status_change(order: OrderSnapshot, req: StatusRequest<'_>) -> OrderResult<Transition> {
    let target = req.target;
    check_edge(&order, target)?;
    let notes_limit = if target == OrderStatus::Cancelled {
        MAX_SHORT_NOTE_LEN
    } else {
        MAX_NOTE_LEN
    };
    validate_optional_text(req.notes, "notes", notes_limit).map_err(OrderError::Validation)?;

    let mut next = order;
    let mut released = None;
    let newly_assigned = match req.staff {
        StaffChange::Assign(staff_id) if !next.is_assigned_to(&staff_id) => {
            released = next.delivery_staff_id.replace(staff_id.clone());
            next.assigned_at = Some(req.now);
            Some(staff_id)
        }
        StaffChange::Release => {
            released = next.delivery_staff_id.take();
            next.assigned_at = None;
            None
        }
        _ => None,
    };

    let mut reached = target;
    match target {
        OrderStatus::Confirmed => {
            if next.delivery_staff_id.is_some() {
                reached = OrderStatus::Delivering;
            }
        }
        OrderStatus::Delivering => {
            if next.delivery_staff_id.is_none() {
                return Err(OrderError::Validation(
                    "no delivery staff assigned to this order".into(),
                ));
            }
        }
        OrderStatus::Delivered => {
            if next.is_cod() && next.payment_proof.is_none() {
                return Err(OrderError::PaymentProofRequired);
            }
            if !next.is_cod() && next.payment_status == PaymentStatus::Pending {
                next.payment_status = PaymentStatus::Completed;
            }
            next.actual_delivery_time = Some(req.now);
        }
        OrderStatus::Cancelled => {
            let cancelled_by = CancelledBy::from_role(req.actor.role()).ok_or_else(|| {
                OrderError::Forbidden("delivery staff cannot cancel orders".into())
            })?;
            next.cancellation = Some(Cancellation {
                reason: req.notes.map(str::to_string),
                cancelled_by,
                cancelled_at: req.now,
            });
        }
        OrderStatus::Refunded => {
            next.payment_status = PaymentStatus::Refunded;
        }
        OrderStatus::Pending => {
            return Err(OrderError::InvalidTransition {
                from: next.status,
                to: target,
            });
        }
    }

    record_status(&mut next, target, req.actor, req.notes, req.now);
    if reached != target {
        record_status(&mut next, reached, req.actor, None, req.now);
    }
    next.status = reached;
    touch(&mut next, req.now);

    let mut effects = vec![Effect::Notify {
        recipient: next.user_id.clone(),
        kind: NotificationType::for_status(target),
    }];
    if let Some(staff_id) = &newly_assigned {
        effects.push(Effect::Notify {
            recipient: staff_id.clone(),
            kind: NotificationType::DeliveryAssigned,
        });
    }
    effects.push(Effect::Push {
        room: Room::User(next.user_id.clone()),
        kind: OrderEventKind::for_status(reached),
    });
    if let Some(staff_id) = &next.delivery_staff_id {
        let kind = if newly_assigned.is_some() {
            OrderEventKind::DeliveryAssigned
        } else {
            OrderEventKind::for_status(reached)
        };
        effects.push(Effect::Push {
            room: Room::Delivery(staff_id.clone()),
            kind,
        });
    }
    if let Some(previous) = released {
        effects.push(Effect::Push {
            room: Room::Delivery(previous),
            kind: OrderEventKind::DeliveryUnassigned,
        });
    }

    Ok(Transition {
        order: next,
        effects,
    })
}

/// Plan the COD completion sub-path: attach proof, settle payment, deliver
pub fn plan_cod_completion(
    order: OrderSnapshot,
    actor: &Actor,
    proof: &str,
    now: i64,
) -> OrderResult<Transition> {
    require_assigned_staff(actor, &order)?;
    if !order.is_cod() {
        return Err(OrderError::Validation(
            "order is not cash on delivery".into(),
        ));
    }
    if order.status != OrderStatus::Delivering {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Delivered,
        });
    }
    validate_required_text(proof, "paymentProof", MAX_URL_LEN).map_err(OrderError::Validation)?;

    let mut next = order;
    next.payment_proof = Some(proof.trim().to_string());
    next.payment_status = PaymentStatus::Completed;
    plan_status_change(
        next,
        StatusRequest {
            target: OrderStatus::Delivered,
            actor,
            notes: None,
            staff: StaffChange::Keep,
            now,
        },
    )
}

/// Plan attaching a COD payment proof without completing the delivery
pub fn plan_payment_proof(
    order: OrderSnapshot,
    actor: &Actor,
    proof: &str,
    now: i64,
) -> OrderResult<Transition> {
    require_assigned_staff(actor, &order)?;
    if !order.is_cod() {
        return Err(OrderError::Validation(
            "order is not cash on delivery".into(),
        ));
    }
    if order.status != OrderStatus::Delivering {
        return Err(OrderError::Validation(
            "payment proof can only be attached while the order is out for delivery".into(),
        ));
    }
    validate_required_text(proof, "paymentProof", MAX_URL_LEN).map_err(OrderError::Validation)?;

    let mut next = order;
    next.payment_proof = Some(proof.trim().to_string());
    next.payment_status = PaymentStatus::Completed;
    touch(&mut next, now);

    let effects = vec![
        Effect::Notify {
            recipient: next.user_id.clone(),
            kind: NotificationType::PaymentSuccess,
        },
        Effect::Push {
            room: Room::User(next.user_id.clone()),
            kind: OrderEventKind::PaymentUpdated,
        },
        Effect::Push {
            room: staff_room(&next),
            kind: OrderEventKind::PaymentUpdated,
        },
    ];
    Ok(Transition {
        order: next,
        effects,
    })
}

// ============================================================================
// Rating
// ============================================================================

/// Plan a one-time rating by the owner of a delivered order
pub fn plan_rating(
    order: OrderSnapshot,
    actor: &Actor,
    stars: u8,
    feedback: Option<&str>,
    now: i64,
) -> OrderResult<Transition> {
    match actor {
        Actor::User(user_id) if order.is_owned_by(user_id) => {}
        _ => {
            return Err(OrderError::Forbidden(
                "only the order owner can rate it".into(),
            ));
        }
    }
    if order.status != OrderStatus::Delivered {
        return Err(OrderError::Validation(
            "only delivered orders can be rated".into(),
        ));
    }
    if order.rating.is_some() {
        return Err(OrderError::AlreadyRated);
    }
    if !(1..=5).contains(&stars) {
        return Err(OrderError::Validation(format!(
            "rating must be between 1 and 5, got {}",
            stars
        )));
    }
    validate_optional_text(feedback, "feedback", MAX_NOTE_LEN).map_err(OrderError::Validation)?;

    let mut next = order;
    next.rating = Some(Rating {
        stars,
        feedback: feedback.map(str::to_string),
        rated_at: now,
    });
    touch(&mut next, now);

    let mut effects = vec![Effect::Push {
        room: Room::User(next.user_id.clone()),
        kind: OrderEventKind::OrderRated,
    }];
    if next.delivery_staff_id.is_some() {
        effects.push(Effect::Push {
            room: staff_room(&next),
            kind: OrderEventKind::OrderRated,
        });
    }
    Ok(Transition {
        order: next,
        effects,
    })
}

// ============================================================================
// Assignment
// ============================================================================

/// Plan assigning (or reassigning) delivery staff
///
/// A `confirmed` order advances to `delivering`; a `pending` order keeps
/// its status and the assignment takes effect when it is confirmed.
pub fn plan_assignment(
    order: OrderSnapshot,
    staff_id: &str,
    actor: &Actor,
    now: i64,
) -> OrderResult<Transition> {
    if order.is_terminal() {
        return Err(OrderError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Delivering,
        });
    }
    if order.is_assigned_to(staff_id) {
        return Err(OrderError::Validation(format!(
            "order is already assigned to {}",
            staff_id
        )));
    }

    let mut next = order;
    let previous_staff = next.delivery_staff_id.replace(staff_id.to_string());
    next.assigned_at = Some(now);
    let advanced = next.status == OrderStatus::Confirmed;
    if advanced {
        record_status(&mut next, OrderStatus::Delivering, actor, None, now);
        next.status = OrderStatus::Delivering;
    }
    touch(&mut next, now);

    let mut effects = vec![Effect::Notify {
        recipient: staff_id.to_string(),
        kind: NotificationType::DeliveryAssigned,
    }];
    if advanced {
        effects.push(Effect::Notify {
            recipient: next.user_id.clone(),
            kind: NotificationType::OrderOutForDelivery,
        });
    }
    effects.push(Effect::Push {
        room: Room::User(next.user_id.clone()),
        kind: if advanced {
            OrderEventKind::OrderOutForDelivery
        } else {
            OrderEventKind::DeliveryAssigned
        },
    });
    effects.push(Effect::Push {
        room: Room::Delivery(staff_id.to_string()),
        kind: OrderEventKind::DeliveryAssigned,
    });
    if let Some(previous) = previous_staff {
        effects.push(Effect::Push {
            room: Room::Delivery(previous),
            kind: OrderEventKind::DeliveryUnassigned,
        });
    }
    Ok(Transition {
        order: next,
        effects,
    })
}

// ============================================================================
// Payment
// ============================================================================

/// Plan recording a payment provider outcome for a non-COD order
pub fn plan_payment_result(
    order: OrderSnapshot,
    outcome: PaymentOutcome,
    now: i64,
) -> OrderResult<Transition> {
    if order.is_cod() {
        return Err(OrderError::Validation(
            "COD payments are settled on delivery".into(),
        ));
    }
    if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Refunded) {
        return Err(OrderError::Validation(format!(
            "order is {}, payment cannot change",
            order.status
        )));
    }
    if matches!(
        order.payment_status,
        PaymentStatus::Completed | PaymentStatus::Refunded
    ) {
        return Err(OrderError::Validation("payment is already settled".into()));
    }

    let mut next = order;
    let kind = match outcome {
        PaymentOutcome::Succeeded => {
            next.payment_status = PaymentStatus::Completed;
            NotificationType::PaymentSuccess
        }
        PaymentOutcome::Failed => {
            next.payment_status = PaymentStatus::Failed;
            NotificationType::PaymentFailed
        }
    };
    touch(&mut next, now);

    let effects = vec![
        Effect::Notify {
            recipient: next.user_id.clone(),
            kind,
        },
        Effect::Push {
            room: Room::User(next.user_id.clone()),
            kind: OrderEventKind::PaymentUpdated,
        },
    ];
    Ok(Transition {
        order: next,
        effects,
    })
}

/// Plan a refund
///
/// Non-terminal orders move to `refunded`; delivered or cancelled orders
/// keep their status and only the payment is marked refunded.
pub fn plan_refund(
    order: OrderSnapshot,
    actor: &Actor,
    notes: Option<&str>,
    now: i64,
) -> OrderResult<Transition> {
    if !actor.is_privileged() {
        return Err(OrderError::Forbidden("only admins can refund payments".into()));
    }
    match order.payment_status {
        PaymentStatus::Completed => {}
        PaymentStatus::Refunded => {
            return Err(OrderError::Validation(
                "payment has already been refunded".into(),
            ));
        }
        PaymentStatus::Pending | PaymentStatus::Failed => {
            return Err(OrderError::Validation(
                "only completed payments can be refunded".into(),
            ));
        }
    }

    if !order.is_terminal() {
        return plan_status_change(
            order,
            StatusRequest {
                target: OrderStatus::Refunded,
                actor,
                notes,
                staff: StaffChange::Keep,
                now,
            },
        );
    }

    validate_optional_text(notes, "notes", MAX_NOTE_LEN).map_err(OrderError::Validation)?;
    let mut next = order;
    next.payment_status = PaymentStatus::Refunded;
    touch(&mut next, now);

    let effects = vec![
        Effect::Notify {
            recipient: next.user_id.clone(),
            kind: NotificationType::PaymentRefunded,
        },
        Effect::Push {
            room: Room::User(next.user_id.clone()),
            kind: OrderEventKind::PaymentUpdated,
        },
    ];
    Ok(Transition {
        order: next,
        effects,
    })
}

// ============================================================================
// Creation
// ============================================================================

/// Plan a new `pending` order
pub fn plan_new_order(
    order_id: String,
    order_number: String,
    user_id: &str,
    input: NewOrder,
    now: i64,
) -> OrderResult<Transition> {
    if input.items.is_empty() {
        return Err(OrderError::Validation(
            "order must contain at least one item".into(),
        ));
    }
    validate_optional_text(input.notes.as_deref(), "notes", MAX_NOTE_LEN)
        .map_err(OrderError::Validation)?;
    if let Some(location) = &input.delivery_location {
        validate_location(location)?;
    }

    let mut items = Vec::with_capacity(input.items.len());
    for item in input.items {
        validate_required_text(&item.dish_id, "dishId", MAX_NAME_LEN)
            .map_err(OrderError::Validation)?;
        validate_required_text(&item.name, "name", MAX_NAME_LEN).map_err(OrderError::Validation)?;
        validate_optional_text(
            item.special_instructions.as_deref(),
            "specialInstructions",
            MAX_SHORT_NOTE_LEN,
        )
        .map_err(OrderError::Validation)?;
        money::validate_line_item(&item)?;
        items.push(LineItem {
            line_total: money::line_total(item.price, item.quantity),
            dish_id: item.dish_id,
            name: item.name,
            price: item.price,
            quantity: item.quantity,
            special_instructions: item.special_instructions,
        });
    }
    let totals = money::compute_totals(&items, input.tax, input.discount)?;

    let order = OrderSnapshot {
        order_id,
        order_number,
        user_id: user_id.to_string(),
        status: OrderStatus::Pending,
        items,
        total_amount: totals.total_amount,
        tax: money::to_f64(money::to_decimal(input.tax)),
        discount: money::to_f64(money::to_decimal(input.discount)),
        final_amount: totals.final_amount,
        payment_method: input.payment_method,
        payment_status: PaymentStatus::Pending,
        payment_proof: None,
        delivery_location: input.delivery_location,
        notes: input.notes,
        delivery_staff_id: None,
        assigned_at: None,
        rating: None,
        cancellation: None,
        status_history: vec![StatusChange {
            status: OrderStatus::Pending,
            changed_by: shared::order::ActorRole::User,
            notes: None,
            changed_at: now,
        }],
        created_at: now,
        updated_at: now,
        actual_delivery_time: None,
        revision: 1,
    };

    let effects = vec![
        Effect::Notify {
            recipient: order.user_id.clone(),
            kind: NotificationType::OrderPlaced,
        },
        Effect::Push {
            room: Room::User(order.user_id.clone()),
            kind: OrderEventKind::OrderPlaced,
        },
        Effect::AnnounceNewOrder,
    ];
    Ok(Transition { order, effects })
}

// ============================================================================
// Helpers
// ============================================================================

fn require_assigned_staff(actor: &Actor, order: &OrderSnapshot) -> OrderResult<()> {
    match actor {
        Actor::DeliveryStaff(staff_id) if order.is_assigned_to(staff_id) => Ok(()),
        _ => Err(OrderError::Forbidden(
            "only the assigned delivery staff can do this".into(),
        )),
    }
}

fn validate_location(location: &DeliveryLocation) -> OrderResult<()> {
    validate_required_text(&location.building, "building", MAX_NAME_LEN)
        .map_err(OrderError::Validation)?;
    validate_optional_text(location.floor.as_deref(), "floor", MAX_NAME_LEN)
        .map_err(OrderError::Validation)?;
    validate_optional_text(location.desk.as_deref(), "desk", MAX_NAME_LEN)
        .map_err(OrderError::Validation)
}

fn staff_room(order: &OrderSnapshot) -> Room {
    Room::Delivery(order.delivery_staff_id.clone().unwrap_or_default())
}

fn record_status(
    order: &mut OrderSnapshot,
    status: OrderStatus,
    actor: &Actor,
    notes: Option<&str>,
    now: i64,
) {
    order.status_history.push(StatusChange {
        status,
        changed_by: actor.role(),
        notes: notes.map(str::to_string),
        changed_at: now,
    });
}

fn touch(order: &mut OrderSnapshot, now: i64) {
    order.updated_at = now;
    order.revision += 1;
}
