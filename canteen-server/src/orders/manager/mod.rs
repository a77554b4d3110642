//! OrdersManager - order operations, persistence and effect dispatch
//!
//! # Operation Flow
//!
//! ```text
//! operation(order_id, actor, ...)
//!     ├─ 1. Begin write transaction
//!     ├─ 2. Load order (NotFound), stale-state check
//!     ├─ 3. Resolve staff (assignment policy, same transaction)
//!     ├─ 4. Plan transition (pure: authorize, check edge, build snapshot)
//!     ├─ 5. Verify money invariant, store snapshot
//!     ├─ 6. Commit
//!     ├─ 7. Record notifications (failures logged, swallowed)
//!     └─ 8. Push snapshots to rooms (non-blocking)
//! ```
//!
//! Any failure before commit drops the transaction, which aborts it: the
//! stored order is unchanged and no effect runs.

use chrono_tz::Tz;
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};
use shared::message::PushEvent;
use shared::notification::NotificationData;
use shared::order::{Actor, NewOrder, OrderSnapshot, OrderStatus, PaymentOutcome};
use shared::util::{new_id, now_millis};
use std::collections::HashMap;
use std::sync::Arc;

use super::dashboard::{self, DashboardStats, TimeWindow};
use super::error::{OrderError, OrderResult};
use super::money;
use super::policy::{self, StaffLoad};
use super::storage::{DishRating, OrderStorage};
use super::transition::{
    self, Effect, StaffChange, StatusRequest, Transition, authorize_status_change, check_edge,
};
use crate::notifications::NotificationLedger;
use crate::realtime::FanoutRouter;
use crate::staff::StaffRepository;
use crate::utils::time;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

/// Default per-staff cap on active deliveries
pub const DEFAULT_MAX_ACTIVE_DELIVERIES: usize = 3;

/// Dishes listed in the dashboard
const DASHBOARD_TOP_DISHES: usize = 10;

/// Tunables the manager reads on every operation
#[derive(Debug, Clone, Copy)]
pub struct ManagerSettings {
    pub max_active_deliveries: usize,
    /// Business timezone (order number date, dashboard windows)
    pub tz: Tz,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            max_active_deliveries: DEFAULT_MAX_ACTIVE_DELIVERIES,
            tz: chrono_tz::Asia::Kolkata,
        }
    }
}

/// Optional arguments of a status change
#[derive(Debug, Clone, Default)]
pub struct TransitionOptions {
    pub notes: Option<String>,
    /// Explicit delivery staff (confirm / dispatch)
    pub staff_id: Option<String>,
    /// Fail with `StaleState` unless the order is still in this status
    pub expected_status: Option<OrderStatus>,
}

/// Result of an auto-assignment sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepOutcome {
    pub assigned_count: usize,
    /// Confirmed orders without staff when the sweep started
    pub total_candidates: usize,
}

#[derive(Clone)]
pub struct OrdersManager {
    storage: OrderStorage,
    staff: StaffRepository,
    ledger: NotificationLedger,
    router: Arc<dyn FanoutRouter>,
    settings: ManagerSettings,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl OrdersManager {
    pub fn new(
        storage: OrderStorage,
        staff: StaffRepository,
        ledger: NotificationLedger,
        router: Arc<dyn FanoutRouter>,
        settings: ManagerSettings,
    ) -> Self {
        Self {
            storage,
            staff,
            ledger,
            router,
            settings,
        }
    }

    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    pub fn staff(&self) -> &StaffRepository {
        &self.staff
    }

    pub fn ledger(&self) -> &NotificationLedger {
        &self.ledger
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Place a new `pending` order for `user_id`
    pub fn create_order(&self, user_id: &str, input: NewOrder) -> OrderResult<OrderSnapshot> {
        validate_required_text(user_id, "userId", MAX_NAME_LEN).map_err(OrderError::Validation)?;

        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let order_number = self
            .storage
            .next_order_number(&txn, time::business_date(now, self.settings.tz))?;
        let transition = transition::plan_new_order(new_id(), order_number, user_id, input, now)?;
        money::verify_totals(&transition.order)?;
        self.storage.store_order(&txn, &transition.order)?;
        txn.commit()?;

        tracing::info!(
            order_id = %transition.order.order_id,
            order_number = %transition.order.order_number,
            user_id = %user_id,
            final_amount = transition.order.final_amount,
            "Order placed"
        );
        self.dispatch(&transition);
        Ok(transition.order)
    }

    // ========================================================================
    // Status changes
    // ========================================================================

    /// Move an order to `target`
    ///
    /// Entering `confirmed` resolves delivery staff in the same transaction:
    /// an explicit `staff_id`, an existing assignment that is still
    /// available, or the least-loaded available staff member. With staff
    /// resolved the order continues to `delivering`; otherwise it stays
    /// `confirmed` for the sweep.
    pub fn apply_status_transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        actor: &Actor,
        options: TransitionOptions,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, options.expected_status, |txn, order| {
            authorize_status_change(actor, &order, target)?;
            check_edge(&order, target)?;
            let staff = match target {
                OrderStatus::Confirmed => {
                    self.resolve_staff(txn, &order, options.staff_id.as_deref(), true)?
                }
                OrderStatus::Delivering => {
                    self.resolve_staff(txn, &order, options.staff_id.as_deref(), false)?
                }
                _ => StaffChange::Keep,
            };
            transition::plan_status_change(
                order,
                StatusRequest {
                    target,
                    actor,
                    notes: options.notes.as_deref(),
                    staff,
                    now,
                },
            )
        });
        let transition = log_denied("apply_status_transition", order_id, actor, result)?;

        tracing::info!(
            order_id = %order_id,
            requested = %target,
            status = %transition.order.status,
            actor = %actor,
            staff_id = ?transition.order.delivery_staff_id,
            "Order status changed"
        );
        self.dispatch(&transition);
        Ok(transition.order)
    }

    /// Assigned staff settles a COD order and completes the delivery
    pub fn complete_cod_delivery(
        &self,
        order_id: &str,
        actor: &Actor,
        proof_ref: &str,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, None, |_, order| {
            transition::plan_cod_completion(order, actor, proof_ref, now)
        });
        let transition = log_denied("complete_cod_delivery", order_id, actor, result)?;

        tracing::info!(order_id = %order_id, actor = %actor, "COD delivery completed");
        self.dispatch(&transition);
        Ok(transition.order)
    }

    /// Assigned staff uploads COD proof while still out for delivery
    pub fn attach_payment_proof(
        &self,
        order_id: &str,
        actor: &Actor,
        proof_ref: &str,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, None, |_, order| {
            transition::plan_payment_proof(order, actor, proof_ref, now)
        });
        let transition = log_denied("attach_payment_proof", order_id, actor, result)?;

        tracing::info!(order_id = %order_id, actor = %actor, "Payment proof attached");
        self.dispatch(&transition);
        Ok(transition.order)
    }

    /// Owner rates a delivered order once; the stars feed every dish line's average
    pub fn add_rating(
        &self,
        order_id: &str,
        actor: &Actor,
        stars: u8,
        feedback: Option<&str>,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, None, |_, order| {
            transition::plan_rating(order, actor, stars, feedback, now)
        });
        let transition = log_denied("add_rating", order_id, actor, result)?;

        let dish_ids: Vec<String> = transition
            .order
            .items
            .iter()
            .map(|item| item.dish_id.clone())
            .collect();
        if let Err(e) = self.storage.record_dish_ratings(&dish_ids, stars) {
            tracing::warn!(order_id = %order_id, error = %e, "Failed to update dish ratings");
        }

        tracing::info!(order_id = %order_id, stars, "Order rated");
        self.dispatch(&transition);
        Ok(transition.order)
    }

    // ========================================================================
    // Assignment
    // ========================================================================

    /// Manual assignment by an admin
    ///
    /// The staff member must exist and be available; the load cap does not
    /// apply to manual overrides.
    pub fn assign_delivery_staff(
        &self,
        order_id: &str,
        staff_id: &str,
        actor: &Actor,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, None, |txn, order| {
            if !actor.is_privileged() {
                return Err(OrderError::Forbidden(
                    "only admins can assign delivery staff".into(),
                ));
            }
            let member = self
                .staff
                .get_txn(txn, staff_id)?
                .ok_or_else(|| OrderError::AssignmentUnavailable(staff_id.to_string()))?;
            if !member.is_assignable() {
                return Err(OrderError::AssignmentUnavailable(staff_id.to_string()));
            }
            transition::plan_assignment(order, staff_id, actor, now)
        });
        let transition = log_denied("assign_delivery_staff", order_id, actor, result)?;

        tracing::info!(
            order_id = %order_id,
            staff_id = %staff_id,
            status = %transition.order.status,
            "Delivery staff assigned manually"
        );
        self.dispatch(&transition);
        Ok(transition.order)
    }

    /// Assign every confirmed order without staff, oldest first
    ///
    /// Runs in one write transaction. Stops at the first order nobody can
    /// take; a second run right after finds nothing left to do.
    pub fn auto_assign_sweep(&self) -> OrderResult<SweepOutcome> {
        let now = now_millis();
        let txn = self.storage.begin_write()?;
        let pending = self.storage.unassigned_confirmed_txn(&txn)?;
        let total_candidates = pending.len();
        if pending.is_empty() {
            return Ok(SweepOutcome::default());
        }

        let candidates = self.load_candidates(&txn)?;
        let order_ids: Vec<String> = pending.iter().map(|o| o.order_id.clone()).collect();
        let plan = policy::plan_sweep(&order_ids, candidates, self.settings.max_active_deliveries);
        if plan.is_empty() {
            tracing::debug!(total_candidates, "Auto-assign: no delivery staff available");
            return Ok(SweepOutcome {
                assigned_count: 0,
                total_candidates,
            });
        }

        let mut by_id: HashMap<String, OrderSnapshot> = pending
            .into_iter()
            .map(|o| (o.order_id.clone(), o))
            .collect();
        let mut transitions = Vec::with_capacity(plan.len());
        for (order_id, staff_id) in plan {
            let Some(order) = by_id.remove(&order_id) else {
                continue;
            };
            let transition = transition::plan_assignment(order, &staff_id, &Actor::System, now)?;
            money::verify_totals(&transition.order)?;
            self.storage.store_order(&txn, &transition.order)?;
            transitions.push(transition);
        }
        txn.commit()?;

        let outcome = SweepOutcome {
            assigned_count: transitions.len(),
            total_candidates,
        };
        tracing::info!(
            assigned = outcome.assigned_count,
            total_candidates,
            "Auto-assign sweep completed"
        );
        for transition in &transitions {
            self.dispatch(transition);
        }
        Ok(outcome)
    }

    // ========================================================================
    // Payment
    // ========================================================================

    /// Payment provider callback for a non-COD order
    pub fn record_payment(
        &self,
        order_id: &str,
        outcome: PaymentOutcome,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let transition = self.mutate(order_id, None, |_, order| {
            transition::plan_payment_result(order, outcome, now)
        })?;

        tracing::info!(
            order_id = %order_id,
            outcome = ?outcome,
            payment_status = ?transition.order.payment_status,
            "Payment result recorded"
        );
        self.dispatch(&transition);
        Ok(transition.order)
    }

    /// Refund a completed payment (admin / system)
    pub fn refund_payment(
        &self,
        order_id: &str,
        actor: &Actor,
        notes: Option<&str>,
    ) -> OrderResult<OrderSnapshot> {
        let now = now_millis();
        let result = self.mutate(order_id, None, |_, order| {
            transition::plan_refund(order, actor, notes, now)
        });
        let transition = log_denied("refund_payment", order_id, actor, result)?;

        tracing::info!(
            order_id = %order_id,
            status = %transition.order.status,
            actor = %actor,
            "Payment refunded"
        );
        self.dispatch(&transition);
        Ok(transition.order)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_order(&self, order_id: &str) -> OrderResult<OrderSnapshot> {
        self.storage
            .get_order(order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))
    }

    pub fn list_orders_for_user(&self, user_id: &str) -> OrderResult<Vec<OrderSnapshot>> {
        Ok(self.storage.orders_for_user(user_id)?)
    }

    pub fn list_orders_for_staff(&self, staff_id: &str) -> OrderResult<Vec<OrderSnapshot>> {
        Ok(self.storage.orders_for_staff(staff_id)?)
    }

    pub fn dish_rating(&self, dish_id: &str) -> OrderResult<Option<DishRating>> {
        Ok(self.storage.get_dish_rating(dish_id)?)
    }

    pub fn dashboard(&self, window: TimeWindow) -> OrderResult<DashboardStats> {
        let orders = self.storage.all_orders()?;
        let stats = dashboard::summarize(
            &orders,
            window,
            now_millis(),
            self.settings.tz,
            DASHBOARD_TOP_DISHES,
        );
        Ok(stats)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Load → plan → verify → store → commit, all in one write transaction
    fn mutate<F>(
        &self,
        order_id: &str,
        expected_status: Option<OrderStatus>,
        plan: F,
    ) -> OrderResult<Transition>
    where
        F: FnOnce(&WriteTransaction, OrderSnapshot) -> OrderResult<Transition>,
    {
        let txn = self.storage.begin_write()?;
        let order = self
            .storage
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::NotFound(order_id.to_string()))?;
        if let Some(expected) = expected_status
            && order.status != expected
        {
            return Err(OrderError::StaleState {
                expected,
                actual: order.status,
            });
        }

        let transition = plan(&txn, order)?;
        money::verify_totals(&transition.order)?;
        self.storage.store_order(&txn, &transition.order)?;
        txn.commit()?;
        Ok(transition)
    }

    /// Decide the delivery staff for a confirm / dispatch request
    fn resolve_staff(
        &self,
        txn: &WriteTransaction,
        order: &OrderSnapshot,
        explicit: Option<&str>,
        auto_pick: bool,
    ) -> OrderResult<StaffChange> {
        let cap = self.settings.max_active_deliveries;

        if let Some(staff_id) = explicit {
            let member = self
                .staff
                .get_txn(txn, staff_id)?
                .ok_or_else(|| OrderError::AssignmentUnavailable(staff_id.to_string()))?;
            if !member.is_assignable() {
                return Err(OrderError::AssignmentUnavailable(staff_id.to_string()));
            }
            if order.is_assigned_to(staff_id) {
                return Ok(StaffChange::Keep);
            }
            let loads = self.storage.staff_loads_txn(txn)?;
            if loads.get(staff_id).copied().unwrap_or(0) >= cap {
                return Err(OrderError::AssignmentUnavailable(staff_id.to_string()));
            }
            return Ok(StaffChange::Assign(staff_id.to_string()));
        }

        if let Some(current) = order.delivery_staff_id.as_deref() {
            let still_assignable = self
                .staff
                .get_txn(txn, current)?
                .is_some_and(|member| member.is_assignable());
            if still_assignable {
                return Ok(StaffChange::Keep);
            }
            if !auto_pick {
                return Err(OrderError::AssignmentUnavailable(current.to_string()));
            }
            tracing::info!(
                order_id = %order.order_id,
                staff_id = %current,
                "Assigned staff no longer available, reassigning"
            );
            return Ok(self
                .pick_least_loaded(txn, order)?
                .map_or(StaffChange::Release, StaffChange::Assign));
        }

        if !auto_pick {
            return Ok(StaffChange::Keep);
        }
        Ok(self
            .pick_least_loaded(txn, order)?
            .map_or(StaffChange::Keep, StaffChange::Assign))
    }

    /// Least-loaded assignable staff under the cap, if any
    fn pick_least_loaded(
        &self,
        txn: &WriteTransaction,
        order: &OrderSnapshot,
    ) -> OrderResult<Option<String>> {
        let candidates = self.load_candidates(txn)?;
        match policy::pick_least_loaded(&candidates, self.settings.max_active_deliveries) {
            Some(index) => Ok(Some(candidates[index].staff_id.clone())),
            None => {
                tracing::info!(
                    order_id = %order.order_id,
                    candidates = candidates.len(),
                    "No delivery staff available, order stays confirmed"
                );
                Ok(None)
            }
        }
    }

    /// Assignable staff in ID order with their current loads
    fn load_candidates(&self, txn: &WriteTransaction) -> OrderResult<Vec<StaffLoad>> {
        let members = self.staff.candidates_txn(txn)?;
        let loads = self.storage.staff_loads_txn(txn)?;
        Ok(policy::with_loads(
            members.into_iter().map(|m| m.id),
            &loads,
        ))
    }

    /// Run effects of a committed transition: notifications, then pushes
    fn dispatch(&self, transition: &Transition) {
        let order = &transition.order;

        for effect in &transition.effects {
            if let Effect::Notify { recipient, kind } = effect {
                let data = NotificationData {
                    order_id: Some(order.order_id.clone()),
                    order_number: Some(order.order_number.clone()),
                    amount: Some(order.final_amount),
                    location: order.delivery_location.as_ref().map(ToString::to_string),
                };
                if let Err(e) = self.ledger.record_order_event(recipient, *kind, data) {
                    tracing::warn!(
                        order_id = %order.order_id,
                        recipient = %recipient,
                        kind = %kind,
                        error = %e,
                        "Failed to record notification"
                    );
                }
            }
        }

        for effect in &transition.effects {
            match effect {
                Effect::Push { room, kind } => {
                    let event = PushEvent::OrderUpdate {
                        event_kind: *kind,
                        order: order.clone(),
                    };
                    self.router.push(room, Arc::new(event));
                }
                Effect::AnnounceNewOrder => {
                    let event = PushEvent::NewOrder {
                        order: order.clone(),
                    };
                    self.router.push_to_admin_pool(Arc::new(event));
                }
                Effect::Notify { .. } => {}
            }
        }
    }
}

/// Log authorization denials on the security target
fn log_denied<T>(
    operation: &'static str,
    order_id: &str,
    actor: &Actor,
    result: OrderResult<T>,
) -> OrderResult<T> {
    if let Err(OrderError::Forbidden(reason)) = &result {
        tracing::warn!(
            target: "security",
            operation,
            order_id = %order_id,
            actor = %actor,
            reason = %reason,
            "Order operation denied"
        );
    }
    result
}

#[cfg(test)]
mod tests;
