//! Dashboard aggregation
//!
//! Pure derivation from stored orders: nothing here writes. Windows are
//! computed in the business timezone.

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::order::{OrderSnapshot, OrderStatus, PaymentMethod, PaymentStatus};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use super::money::{to_decimal, to_f64};
use crate::utils::time;

// ============================================================================
// Time Window
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    #[default]
    Today,
    /// Since Monday of the current week
    Week,
    /// Since the first of the current month
    Month,
    /// Since January 1st
    Year,
    All,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }

    /// Inclusive start (Unix millis) of the window containing `now`
    pub fn start_millis(&self, now: i64, tz: Tz) -> Option<i64> {
        let today = time::business_date(now, tz);
        let start: NaiveDate = match self {
            Self::Today => today,
            Self::Week => {
                let weekday = today.weekday().num_days_from_monday();
                today - Duration::days(i64::from(weekday))
            }
            Self::Month => today.with_day(1).unwrap_or(today),
            Self::Year => today.with_ordinal(1).unwrap_or(today),
            Self::All => return None,
        };
        Some(time::day_start_millis(start, tz))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time window: {0}")]
pub struct UnknownTimeWindow(pub String);

impl FromStr for TimeWindow {
    type Err = UnknownTimeWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            "all" => Ok(Self::All),
            other => Err(UnknownTimeWindow(other.to_string())),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Totals over the window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_orders: usize,
    pub by_status: BTreeMap<OrderStatus, usize>,
    /// Sum of `finalAmount` over orders with a completed payment
    pub revenue: f64,
    pub paid_orders: usize,
    pub average_order_value: f64,
    pub refunded_amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodStats {
    pub method: PaymentMethod,
    pub orders: usize,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TopDish {
    pub dish_id: String,
    pub name: String,
    pub quantity: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffStats {
    pub staff_id: String,
    pub delivered: usize,
    /// `None` until one of their deliveries is rated
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub window: TimeWindow,
    pub overview: OverviewStats,
    pub payment_methods: Vec<PaymentMethodStats>,
    pub top_dishes: Vec<TopDish>,
    pub staff_leaderboard: Vec<StaffStats>,
}

// ============================================================================
// Aggregation
// ============================================================================

/// Roll up `orders` created inside `window`
///
/// Cancelled orders count toward status totals but not toward dish or
/// revenue figures.
pub fn summarize(
    orders: &[OrderSnapshot],
    window: TimeWindow,
    now: i64,
    tz: Tz,
    top_limit: usize,
) -> DashboardStats {
    let start = window.start_millis(now, tz);
    let in_window: Vec<&OrderSnapshot> = orders
        .iter()
        .filter(|o| start.is_none_or(|s| o.created_at >= s) && o.created_at <= now)
        .collect();

    let mut by_status = BTreeMap::new();
    let mut revenue = Decimal::ZERO;
    let mut refunded = Decimal::ZERO;
    let mut paid_orders = 0usize;
    let mut methods: HashMap<PaymentMethod, (usize, Decimal)> = HashMap::new();
    let mut dishes: HashMap<&str, (&str, u64, Decimal)> = HashMap::new();
    let mut staff: HashMap<&str, (usize, u64, u32)> = HashMap::new();

    for order in &in_window {
        *by_status.entry(order.status).or_insert(0) += 1;

        let method = methods
            .entry(order.payment_method)
            .or_insert((0, Decimal::ZERO));
        method.0 += 1;

        match order.payment_status {
            PaymentStatus::Completed => {
                let amount = to_decimal(order.final_amount);
                revenue += amount;
                paid_orders += 1;
                method.1 += amount;
            }
            PaymentStatus::Refunded => refunded += to_decimal(order.final_amount),
            PaymentStatus::Pending | PaymentStatus::Failed => {}
        }

        if order.status != OrderStatus::Cancelled {
            for item in &order.items {
                let entry = dishes
                    .entry(item.dish_id.as_str())
                    .or_insert((item.name.as_str(), 0, Decimal::ZERO));
                entry.1 += u64::from(item.quantity);
                entry.2 += to_decimal(item.line_total);
            }
        }

        if order.status == OrderStatus::Delivered
            && let Some(staff_id) = order.delivery_staff_id.as_deref()
        {
            let entry = staff.entry(staff_id).or_insert((0, 0, 0));
            entry.0 += 1;
            if let Some(rating) = &order.rating {
                entry.1 += u64::from(rating.stars);
                entry.2 += 1;
            }
        }
    }

    let average_order_value = if paid_orders > 0 {
        revenue / Decimal::from(paid_orders)
    } else {
        Decimal::ZERO
    };

    let mut payment_methods: Vec<_> = methods
        .into_iter()
        .map(|(method, (orders, revenue))| PaymentMethodStats {
            method,
            orders,
            revenue: to_f64(revenue),
        })
        .collect();
    payment_methods.sort_by(|a, b| {
        b.orders
            .cmp(&a.orders)
            .then_with(|| a.method.as_str().cmp(b.method.as_str()))
    });

    let mut top_dishes: Vec<_> = dishes
        .into_iter()
        .map(|(dish_id, (name, quantity, revenue))| TopDish {
            dish_id: dish_id.to_string(),
            name: name.to_string(),
            quantity,
            revenue: to_f64(revenue),
        })
        .collect();
    top_dishes.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.dish_id.cmp(&b.dish_id))
    });
    top_dishes.truncate(top_limit);

    let mut staff_leaderboard: Vec<_> = staff
        .into_iter()
        .map(|(staff_id, (delivered, star_sum, rated))| StaffStats {
            staff_id: staff_id.to_string(),
            delivered,
            average_rating: (rated > 0).then(|| star_sum as f64 / f64::from(rated)),
        })
        .collect();
    staff_leaderboard.sort_by(|a, b| {
        b.delivered
            .cmp(&a.delivered)
            .then_with(|| a.staff_id.cmp(&b.staff_id))
    });

    DashboardStats {
        window,
        overview: OverviewStats {
            total_orders: in_window.len(),
            by_status,
            revenue: to_f64(revenue),
            paid_orders,
            average_order_value: to_f64(average_order_value),
            refunded_amount: to_f64(refunded),
        },
        payment_methods,
        top_dishes,
        staff_leaderboard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use shared::order::{LineItem, Rating, StatusChange};

    fn tz() -> Tz {
        chrono_tz::Asia::Kolkata
    }

    /// Wednesday 2026-10-14 12:00 IST
    fn now() -> i64 {
        tz().with_ymd_and_hms(2026, 10, 14, 12, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn item(dish_id: &str, price: f64, quantity: u32) -> LineItem {
        LineItem {
            dish_id: dish_id.into(),
            name: format!("Dish {}", dish_id),
            price,
            quantity,
            line_total: price * f64::from(quantity),
            special_instructions: None,
        }
    }

    fn order(id: &str, created_at: i64, status: OrderStatus, items: Vec<LineItem>) -> OrderSnapshot {
        let total: f64 = items.iter().map(|i| i.line_total).sum();
        OrderSnapshot {
            order_id: id.into(),
            order_number: format!("OF261014{}", id),
            user_id: "u-1".into(),
            status,
            items,
            total_amount: total,
            tax: 0.0,
            discount: 0.0,
            final_amount: total,
            payment_method: PaymentMethod::Upi,
            payment_status: PaymentStatus::Pending,
            payment_proof: None,
            delivery_location: None,
            notes: None,
            delivery_staff_id: None,
            assigned_at: None,
            rating: None,
            cancellation: None,
            status_history: vec![StatusChange {
                status: OrderStatus::Pending,
                changed_by: shared::order::ActorRole::User,
                notes: None,
                changed_at: created_at,
            }],
            created_at,
            updated_at: created_at,
            actual_delivery_time: None,
            revision: 1,
        }
    }

    #[test]
    fn test_window_parse() {
        assert_eq!("week".parse::<TimeWindow>().unwrap(), TimeWindow::Week);
        assert!("decade".parse::<TimeWindow>().is_err());
        assert_eq!(TimeWindow::All.start_millis(now(), tz()), None);
    }

    #[test]
    fn test_window_starts() {
        let week = TimeWindow::Week.start_millis(now(), tz()).unwrap();
        let monday = tz().with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap();
        assert_eq!(week, monday.timestamp_millis());

        let month = TimeWindow::Month.start_millis(now(), tz()).unwrap();
        let first = tz().with_ymd_and_hms(2026, 10, 1, 0, 0, 0).unwrap();
        assert_eq!(month, first.timestamp_millis());

        let year = TimeWindow::Year.start_millis(now(), tz()).unwrap();
        let jan = tz().with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(year, jan.timestamp_millis());
    }

    #[test]
    fn test_summary_counts_and_revenue() {
        let hour = 3_600_000;
        let mut paid = order("1", now() - hour, OrderStatus::Delivered, vec![item("d1", 100.0, 2)]);
        paid.payment_status = PaymentStatus::Completed;
        paid.delivery_staff_id = Some("s1".into());
        paid.rating = Some(Rating {
            stars: 4,
            feedback: None,
            rated_at: now(),
        });

        let mut paid2 = order("2", now() - 2 * hour, OrderStatus::Delivering, vec![item("d2", 50.0, 1)]);
        paid2.payment_status = PaymentStatus::Completed;

        let cancelled = order("3", now() - hour, OrderStatus::Cancelled, vec![item("d1", 100.0, 5)]);
        // ten days ago: outside today and week
        let old = order("4", now() - 240 * hour, OrderStatus::Pending, vec![item("d3", 10.0, 1)]);

        let orders = vec![paid, paid2, cancelled, old];
        let stats = summarize(&orders, TimeWindow::Today, now(), tz(), 10);

        assert_eq!(stats.overview.total_orders, 3);
        assert_eq!(stats.overview.by_status[&OrderStatus::Cancelled], 1);
        assert_eq!(stats.overview.paid_orders, 2);
        assert_eq!(stats.overview.revenue, 250.0);
        assert_eq!(stats.overview.average_order_value, 125.0);

        assert_eq!(stats.top_dishes[0].dish_id, "d1");
        assert_eq!(stats.top_dishes[0].quantity, 2);
        assert_eq!(stats.payment_methods.len(), 1);
        assert_eq!(stats.payment_methods[0].orders, 3);

        assert_eq!(stats.staff_leaderboard.len(), 1);
        assert_eq!(stats.staff_leaderboard[0].delivered, 1);
        assert_eq!(stats.staff_leaderboard[0].average_rating, Some(4.0));

        let all = summarize(&orders, TimeWindow::All, now(), tz(), 1);
        assert_eq!(all.overview.total_orders, 4);
        assert_eq!(all.top_dishes.len(), 1);
    }

    #[test]
    fn test_empty_summary() {
        let stats = summarize(&[], TimeWindow::Month, now(), tz(), 5);
        assert_eq!(stats.overview, OverviewStats::default());
        assert!(stats.top_dishes.is_empty());
    }
}
