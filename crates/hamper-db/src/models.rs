//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Enum-valued columns are stored as text and parsed into domain enums by
//! the conversion helpers below.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use hamper_types::{
    Address, AddressId, EntryDirection, EntryStatus, LedgerEntry, LedgerEntryId, LineItem, Order,
    OrderItem, OrderStatus, OrderType, PaymentStatus, Product, ProductId, Subscription,
    SubscriptionId, UserId,
};

use crate::error::DbError;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub wallet_balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_address_id: Uuid,
    pub frequency: String,
    pub status: String,
    pub next_delivery_date: NaiveDate,
    pub last_delivery_date: Option<NaiveDate>,
    pub payment_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription line-item row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionItemRow {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub variant_weight: Option<String>,
    pub variant_price_cents: Option<i64>,
}

/// Order row from the database
#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub delivery_address_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub order_type: String,
    pub total_cents: i64,
    pub placed_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Order line-item row from the database
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
    pub variant_weight: Option<String>,
}

/// Ledger entry row from the database
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntryRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_cents: i64,
    pub direction: String,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Product row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price_cents: i64,
    pub active: bool,
}

/// Address row from the database
#[derive(Debug, Clone, FromRow)]
pub struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub created_at: DateTime<Utc>,
}

// Conversion implementations from row types to hamper-types domain types

fn parse_column<T>(value: &str, column: &str) -> Result<T, DbError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| DbError::Decode(format!("{column}: {e}")))
}

impl SubscriptionRow {
    /// Assemble the domain subscription from this row and its item rows
    pub fn into_subscription(
        self,
        items: Vec<SubscriptionItemRow>,
    ) -> Result<Subscription, DbError> {
        Ok(Subscription {
            id: SubscriptionId(self.id),
            user_id: UserId(self.user_id),
            delivery_address_id: AddressId(self.delivery_address_id),
            items: items.into_iter().map(SubscriptionItemRow::into_line_item).collect(),
            frequency: parse_column(&self.frequency, "subscriptions.frequency")?,
            status: parse_column(&self.status, "subscriptions.status")?,
            next_delivery_date: self.next_delivery_date,
            last_delivery_date: self.last_delivery_date,
            payment_token: self.payment_token,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl SubscriptionItemRow {
    /// Convert to the domain line-item sum type
    pub fn into_line_item(self) -> LineItem {
        let quantity = self.quantity.max(0) as u32;
        match (self.variant_weight, self.variant_price_cents) {
            (Some(weight), Some(price_cents)) => LineItem::Variant {
                product_id: ProductId(self.product_id),
                quantity,
                weight,
                price_cents,
            },
            _ => LineItem::Standard {
                product_id: ProductId(self.product_id),
                quantity,
            },
        }
    }
}

impl OrderRow {
    /// Assemble the domain order from this row and its item rows
    pub fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DbError> {
        Ok(Order {
            id: hamper_types::OrderId(self.id),
            user_id: UserId(self.user_id),
            subscription_id: self.subscription_id.map(SubscriptionId),
            delivery_address_id: AddressId(self.delivery_address_id),
            items: items.into_iter().map(OrderItemRow::into_order_item).collect(),
            total_cents: self.total_cents,
            status: parse_column::<OrderStatus>(&self.status, "orders.status")?,
            payment_status: parse_column::<PaymentStatus>(
                &self.payment_status,
                "orders.payment_status",
            )?,
            order_type: parse_column::<OrderType>(&self.order_type, "orders.order_type")?,
            placed_on: self.placed_on,
            created_at: self.created_at,
        })
    }
}

impl OrderItemRow {
    /// Convert to the domain order line
    pub fn into_order_item(self) -> OrderItem {
        OrderItem {
            product_id: ProductId(self.product_id),
            name: self.name,
            unit_price_cents: self.unit_price_cents,
            quantity: self.quantity.max(0) as u32,
            variant_weight: self.variant_weight,
        }
    }
}

impl LedgerEntryRow {
    /// Convert to the domain ledger entry
    pub fn into_entry(self) -> Result<LedgerEntry, DbError> {
        Ok(LedgerEntry {
            id: LedgerEntryId(self.id),
            user_id: UserId(self.user_id),
            subscription_id: self.subscription_id.map(SubscriptionId),
            amount_cents: self.amount_cents,
            direction: parse_column::<EntryDirection>(&self.direction, "ledger_entries.direction")?,
            status: parse_column::<EntryStatus>(&self.status, "ledger_entries.status")?,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

impl ProductRow {
    /// Convert to the domain product
    pub fn into_product(self) -> Product {
        Product {
            id: ProductId(self.id),
            name: self.name,
            price_cents: self.price_cents,
            active: self.active,
        }
    }
}

impl AddressRow {
    /// Convert to the domain address
    pub fn into_address(self) -> Address {
        Address {
            id: AddressId(self.id),
            user_id: UserId(self.user_id),
            line1: self.line1,
            line2: self.line2,
            city: self.city,
            postal_code: self.postal_code,
        }
    }
}
