//! Notification templates
//!
//! Title, message and default priority per notification type. Every type
//! has a template; the match is exhaustive, so a new type cannot ship
//! without one.

use shared::notification::{NotificationType, Priority};

/// Values substituted into a template
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    pub order_number: Option<&'a str>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub title: String,
    pub message: String,
    pub priority: Priority,
}

pub fn render(kind: NotificationType, ctx: TemplateContext<'_>) -> Rendered {
    let order = match ctx.order_number {
        Some(number) => format!("order #{}", number),
        None => "your order".to_string(),
    };
    let amount = ctx
        .amount
        .map(|a| format!("₹{:.2}", a))
        .unwrap_or_else(|| "the amount".to_string());

    let (title, message, priority) = match kind {
        NotificationType::OrderPlaced => (
            "Order Placed",
            format!("Your {} has been placed successfully.", order),
            Priority::Medium,
        ),
        NotificationType::OrderConfirmed => (
            "Order Confirmed",
            format!("Your {} has been confirmed by the canteen.", order),
            Priority::Medium,
        ),
        NotificationType::OrderPreparing => (
            "Order Being Prepared",
            format!("The kitchen is preparing your {}.", order),
            Priority::Low,
        ),
        NotificationType::OrderReady => (
            "Order Ready",
            format!("Your {} is ready and waiting for pickup by delivery.", order),
            Priority::Medium,
        ),
        NotificationType::OrderOutForDelivery => (
            "Out for Delivery",
            format!("Your {} is on its way to you.", order),
            Priority::High,
        ),
        NotificationType::OrderDelivered => (
            "Order Delivered",
            format!("Your {} has been delivered. Enjoy your meal!", order),
            Priority::Medium,
        ),
        NotificationType::OrderCancelled => (
            "Order Cancelled",
            format!("Your {} has been cancelled.", order),
            Priority::High,
        ),
        NotificationType::PaymentSuccess => (
            "Payment Successful",
            format!("Payment of {} for {} was received.", amount, order),
            Priority::Medium,
        ),
        NotificationType::PaymentFailed => (
            "Payment Failed",
            format!("Payment for {} failed. Please try again.", order),
            Priority::Urgent,
        ),
        NotificationType::PaymentRefunded => (
            "Payment Refunded",
            format!("{} for {} has been refunded.", capitalize(&amount), order),
            Priority::High,
        ),
        NotificationType::DeliveryAssigned => (
            "New Delivery Assigned",
            format!("{} has been assigned to you for delivery.", capitalize(&order)),
            Priority::High,
        ),
        NotificationType::SystemAnnouncement => (
            "Announcement",
            "There is a new announcement from the canteen.".to_string(),
            Priority::Medium,
        ),
        NotificationType::MenuUpdate => (
            "Menu Updated",
            "The menu has been updated. Take a look at today's dishes.".to_string(),
            Priority::Low,
        ),
        NotificationType::Promotional => (
            "Special Offer",
            "A new offer is available in the canteen.".to_string(),
            Priority::Low,
        ),
    };

    Rendered {
        title: title.to_string(),
        message,
        priority,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::validation::{MAX_MESSAGE_LEN, MAX_TITLE_LEN};

    #[test]
    fn test_order_templates_mention_number() {
        let ctx = TemplateContext {
            order_number: Some("OF261018007"),
            amount: Some(252.0),
        };
        let rendered = render(NotificationType::OrderConfirmed, ctx);
        assert_eq!(rendered.title, "Order Confirmed");
        assert!(rendered.message.contains("#OF261018007"));

        let rendered = render(NotificationType::PaymentSuccess, ctx);
        assert!(rendered.message.contains("₹252.00"));

        let rendered = render(NotificationType::DeliveryAssigned, ctx);
        assert!(rendered.message.starts_with("Order #OF261018007"));
        assert_eq!(rendered.priority, Priority::High);
    }

    #[test]
    fn test_templates_without_context() {
        let rendered = render(NotificationType::PaymentRefunded, TemplateContext::default());
        assert_eq!(rendered.message, "The amount for your order has been refunded.");
    }

    #[test]
    fn test_every_template_fits_limits() {
        let long_number = "OF2610181234";
        for kind in NotificationType::ALL {
            let rendered = render(
                kind,
                TemplateContext {
                    order_number: Some(long_number),
                    amount: Some(99_999.99),
                },
            );
            assert!(rendered.title.chars().count() <= MAX_TITLE_LEN);
            assert!(rendered.message.chars().count() <= MAX_MESSAGE_LEN);
        }
    }
}
