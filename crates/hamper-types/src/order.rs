//! Order snapshot types
//!
//! Orders are emitted once per successful billing cycle and never mutated by
//! the scheduler afterwards; later status advances belong to fulfillment
//! tracking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AddressId, ProductId, SubscriptionId, UserId};

/// Unique order identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    /// Create a new random order ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an order ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order fulfillment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed, not yet picked up
    Pending,
    /// Being prepared for delivery
    Processing,
    /// Handed to delivery
    Shipped,
    /// Received by the customer
    Delivered,
    /// Cancelled before delivery
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(OrderParseError(s.to_string())),
        }
    }
}

/// Payment state of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting payment
    Pending,
    /// Paid in full
    Paid,
    /// Payment attempt failed
    Failed,
    /// Payment returned to the wallet
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(OrderParseError(s.to_string())),
        }
    }
}

/// How the order originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Emitted by a subscription billing cycle
    Subscription,
    /// One-time storefront checkout
    OneTime,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Subscription => write!(f, "subscription"),
            Self::OneTime => write!(f, "onetime"),
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = OrderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "subscription" => Ok(Self::Subscription),
            "onetime" | "one_time" => Ok(Self::OneTime),
            _ => Err(OrderParseError(s.to_string())),
        }
    }
}

/// Error parsing an order enum string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid order field: {0}")]
pub struct OrderParseError(pub String);

/// A price-frozen order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Ordered product
    pub product_id: ProductId,
    /// Product name at billing time
    pub name: String,
    /// Effective unit price in cents at billing time, discount applied
    pub unit_price_cents: i64,
    /// Units ordered
    pub quantity: u32,
    /// Variant weight label, if the line was a variant
    pub variant_weight: Option<String>,
}

/// A billing-cycle order snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID
    pub id: OrderId,
    /// Owning user
    pub user_id: UserId,
    /// Subscription this cycle was billed for; lookup only, not ownership
    pub subscription_id: Option<SubscriptionId>,
    /// Delivery address at billing time
    pub delivery_address_id: AddressId,
    /// Price-frozen order lines
    pub items: Vec<OrderItem>,
    /// Order total in cents
    pub total_cents: i64,
    /// Fulfillment status
    pub status: OrderStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// How the order originated
    pub order_type: OrderType,
    /// The sweep date the order was billed on
    pub placed_on: NaiveDate,
    /// When the order was written
    pub created_at: DateTime<Utc>,
}
