//! Order snapshot emitter
//!
//! Pure conversion of one billing cycle into an immutable order. Prices are
//! frozen copies taken at billing time; a later catalog price change or
//! line-quantity edit affects the next cycle, never an emitted order.

use chrono::NaiveDate;
use uuid::Uuid;

use hamper_db::{CreateOrder, CreateOrderItem};
use hamper_types::{AddressId, OrderStatus, OrderType, PaymentStatus, ProductId, SubscriptionId, UserId};

/// A line item resolved against the catalog, discount applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Billed product
    pub product_id: ProductId,
    /// Product name at billing time
    pub name: String,
    /// Units billed
    pub quantity: u32,
    /// Discounted unit price in cents
    pub unit_price_cents: i64,
    /// Variant weight label, if the line was a variant
    pub variant_weight: Option<String>,
}

/// Apply the subscription discount to a unit price, rounding down
pub fn discounted_unit_price(unit_price_cents: i64, discount_bps: u32) -> i64 {
    unit_price_cents * (10_000 - i64::from(discount_bps)) / 10_000
}

/// Total of a resolved cycle in cents
pub fn cycle_total(lines: &[ResolvedLine]) -> i64 {
    lines
        .iter()
        .map(|line| line.unit_price_cents * i64::from(line.quantity))
        .sum()
}

/// Build the order snapshot for one successfully billed cycle
pub fn build_order(
    order_id: Uuid,
    user_id: UserId,
    subscription_id: SubscriptionId,
    delivery_address_id: AddressId,
    lines: Vec<ResolvedLine>,
    billed_on: NaiveDate,
) -> CreateOrder {
    let total_cents = cycle_total(&lines);

    CreateOrder {
        id: order_id,
        user_id: user_id.0,
        subscription_id: Some(subscription_id.0),
        delivery_address_id: delivery_address_id.0,
        status: OrderStatus::Processing.to_string(),
        payment_status: PaymentStatus::Paid.to_string(),
        order_type: OrderType::Subscription.to_string(),
        total_cents,
        placed_on: billed_on,
        items: lines
            .into_iter()
            .map(|line| CreateOrderItem {
                product_id: line.product_id.0,
                name: line.name,
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                variant_weight: line.variant_weight,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discount_math() {
        // 15% off 120.00 is 102.00
        assert_eq!(discounted_unit_price(12_000, 1_500), 10_200);
        // 15% off 100.00 is 85.00
        assert_eq!(discounted_unit_price(10_000, 1_500), 8_500);
        // Fractions round down
        assert_eq!(discounted_unit_price(99, 1_500), 84);
        // Zero discount is the identity
        assert_eq!(discounted_unit_price(12_000, 0), 12_000);
    }

    #[test]
    fn test_cycle_total_sums_lines() {
        let lines = vec![
            ResolvedLine {
                product_id: ProductId::new(),
                name: "Oat flakes".to_string(),
                quantity: 2,
                unit_price_cents: 8_500,
                variant_weight: None,
            },
            ResolvedLine {
                product_id: ProductId::new(),
                name: "Coffee beans".to_string(),
                quantity: 1,
                unit_price_cents: 10_200,
                variant_weight: Some("1kg".to_string()),
            },
        ];

        assert_eq!(cycle_total(&lines), 2 * 8_500 + 10_200);
    }

    #[test]
    fn test_order_snapshot_freezes_prices() {
        let user_id = UserId::new();
        let subscription_id = SubscriptionId::new();
        let address_id = AddressId::new();
        let product_id = ProductId::new();
        let billed_on = NaiveDate::from_ymd_opt(2026, 8, 6).unwrap();

        let lines = vec![ResolvedLine {
            product_id,
            name: "Coffee beans".to_string(),
            quantity: 3,
            unit_price_cents: 10_200,
            variant_weight: Some("1kg".to_string()),
        }];

        let order = build_order(
            Uuid::new_v4(),
            user_id,
            subscription_id,
            address_id,
            lines,
            billed_on,
        );

        assert_eq!(order.total_cents, 3 * 10_200);
        assert_eq!(order.status, "processing");
        assert_eq!(order.payment_status, "paid");
        assert_eq!(order.order_type, "subscription");
        assert_eq!(order.placed_on, billed_on);
        assert_eq!(order.subscription_id, Some(subscription_id.0));
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].unit_price_cents, 10_200);
        assert_eq!(order.items[0].quantity, 3);
        assert_eq!(order.items[0].variant_weight.as_deref(), Some("1kg"));
    }
}
