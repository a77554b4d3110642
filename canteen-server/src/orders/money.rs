//! Money calculation utilities using rust_decimal for precision
//!
//! All arithmetic happens on `Decimal`; values are converted back to `f64`
//! (rounded to 2 places) for storage and serialization.

use rust_decimal::prelude::*;
use shared::order::{LineItem, NewLineItem, OrderSnapshot};

use super::error::{OrderError, OrderResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per dish
const MAX_PRICE: f64 = 100_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: u32 = 9999;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

#[inline]
fn require_amount(value: f64, field_name: &str) -> OrderResult<()> {
    if !value.is_finite() {
        return Err(OrderError::Validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    if value < 0.0 {
        return Err(OrderError::Validation(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a submitted line item's price and quantity
pub fn validate_line_item(item: &NewLineItem) -> OrderResult<()> {
    require_amount(item.price, "price")?;
    if item.price > MAX_PRICE {
        return Err(OrderError::Validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.price
        )));
    }
    if item.quantity == 0 {
        return Err(OrderError::Validation("quantity must be positive".into()));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(OrderError::Validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    Ok(())
}

/// price × quantity
pub fn line_total(price: f64, quantity: u32) -> f64 {
    to_f64(to_decimal(price) * Decimal::from(quantity))
}

/// Order-level amounts derived from line items
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total_amount: f64,
    pub final_amount: f64,
}

/// Σ line totals, then + tax − discount
///
/// A discount larger than total + tax is rejected rather than clamped.
pub fn compute_totals(items: &[LineItem], tax: f64, discount: f64) -> OrderResult<Totals> {
    require_amount(tax, "tax")?;
    require_amount(discount, "discount")?;

    let total: Decimal = items.iter().map(|item| to_decimal(item.line_total)).sum();
    let final_amount = total + to_decimal(tax) - to_decimal(discount);
    if final_amount < Decimal::ZERO {
        return Err(OrderError::Validation(format!(
            "discount {} exceeds order total {}",
            discount,
            to_f64(total + to_decimal(tax))
        )));
    }

    Ok(Totals {
        total_amount: to_f64(total),
        final_amount: to_f64(final_amount),
    })
}

/// Check the stored amounts against a fresh recomputation
pub fn verify_totals(order: &OrderSnapshot) -> OrderResult<()> {
    let lines_ok = order
        .items
        .iter()
        .all(|item| money_eq(item.line_total, line_total(item.price, item.quantity)));
    let totals = compute_totals(&order.items, order.tax, order.discount)?;
    if !lines_ok
        || !money_eq(totals.total_amount, order.total_amount)
        || !money_eq(totals.final_amount, order.final_amount)
    {
        tracing::error!(
            order_id = %order.order_id,
            stored = order.final_amount,
            computed = totals.final_amount,
            "Order amounts are inconsistent"
        );
        return Err(OrderError::Validation(format!(
            "order {} amounts are inconsistent",
            order.order_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: f64, quantity: u32) -> LineItem {
        LineItem {
            dish_id: "d".into(),
            name: "Dish".into(),
            price,
            quantity,
            line_total: line_total(price, quantity),
            special_instructions: None,
        }
    }

    #[test]
    fn test_to_decimal_precision() {
        let sum_dec = to_decimal(0.1) + to_decimal(0.2);
        assert_eq!(to_f64(sum_dec), 0.3);
    }

    #[test]
    fn test_line_total_rounding() {
        assert_eq!(line_total(10.99, 3), 32.97);
        assert_eq!(line_total(33.333, 3), 100.0);
    }

    #[test]
    fn test_compute_totals() {
        let items = vec![line(120.0, 2), line(45.5, 1)];
        let totals = compute_totals(&items, 14.28, 20.0).unwrap();
        assert_eq!(totals.total_amount, 285.5);
        assert_eq!(totals.final_amount, 279.78);
    }

    #[test]
    fn test_discount_cannot_exceed_total() {
        let items = vec![line(50.0, 1)];
        let err = compute_totals(&items, 0.0, 60.0).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_finite_and_negative() {
        assert!(compute_totals(&[], f64::NAN, 0.0).is_err());
        assert!(compute_totals(&[], 0.0, -1.0).is_err());
        let item = NewLineItem {
            dish_id: "d".into(),
            name: "Dish".into(),
            price: -5.0,
            quantity: 1,
            special_instructions: None,
        };
        assert!(validate_line_item(&item).is_err());
        let item = NewLineItem {
            price: 5.0,
            quantity: 0,
            ..item
        };
        assert!(validate_line_item(&item).is_err());
    }

    #[test]
    fn test_money_eq_tolerance() {
        assert!(money_eq(10.0, 10.005));
        assert!(!money_eq(10.0, 10.02));
    }
}
