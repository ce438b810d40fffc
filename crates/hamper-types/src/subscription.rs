//! Subscription types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AddressId, ProductId, UserId};

/// Unique subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    /// Create a new random subscription ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a subscription ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery cadence
///
/// The cadence is part of the subscription's identity: the same product at a
/// different cadence is an independent subscription, not a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// Delivered every day
    Daily,
    /// Delivered every 7 days
    Weekly,
    /// Delivered once per calendar month
    Monthly,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Daily => write!(f, "daily"),
            Self::Weekly => write!(f, "weekly"),
            Self::Monthly => write!(f, "monthly"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = FrequencyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(FrequencyParseError(s.to_string())),
        }
    }
}

/// Error parsing a frequency string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid frequency: {0}")]
pub struct FrequencyParseError(pub String);

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Reserved for a future pre-authorization step; never produced by enrollment
    Pending,
    /// Eligible for the billing sweep
    Active,
    /// Excluded from the billing sweep, resumable by the user
    Paused,
    /// Terminal; excluded from all further processing
    Cancelled,
}

impl SubscriptionStatus {
    /// Whether a user-driven transition to `to` is permitted
    ///
    /// Billing failure never drives a transition; only explicit user action
    /// (or the configured failure policy) moves a subscription out of
    /// `Active`.
    pub fn can_transition_to(self, to: SubscriptionStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Paused)
                | (Self::Active, Self::Cancelled)
                | (Self::Paused, Self::Active)
                | (Self::Paused, Self::Cancelled)
        )
    }

    /// Terminal statuses admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(StatusParseError(s.to_string())),
        }
    }
}

/// Error parsing a subscription status string
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid subscription status: {0}")]
pub struct StatusParseError(pub String);

/// A subscribed product line
///
/// Items either reference the product's base price or carry a weight variant
/// with its own price. The effective unit price is resolved at the point of
/// use, never by checking field presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineItem {
    /// Product at its base catalog price
    Standard {
        /// Subscribed product
        product_id: ProductId,
        /// Units per delivery, at least 1
        quantity: u32,
    },
    /// Product in a specific weight variant with its own price
    Variant {
        /// Subscribed product
        product_id: ProductId,
        /// Units per delivery, at least 1
        quantity: u32,
        /// Variant weight label, e.g. "1kg"
        weight: String,
        /// Variant price in cents
        price_cents: i64,
    },
}

impl LineItem {
    /// The subscribed product
    pub fn product_id(&self) -> ProductId {
        match self {
            Self::Standard { product_id, .. } | Self::Variant { product_id, .. } => *product_id,
        }
    }

    /// Units per delivery
    pub fn quantity(&self) -> u32 {
        match self {
            Self::Standard { quantity, .. } | Self::Variant { quantity, .. } => *quantity,
        }
    }

    /// Variant weight label, if this is a variant line
    pub fn variant_weight(&self) -> Option<&str> {
        match self {
            Self::Standard { .. } => None,
            Self::Variant { weight, .. } => Some(weight.as_str()),
        }
    }

    /// Effective unit price: the variant price when present, else the
    /// product's base price
    pub fn unit_price_cents(&self, base_price_cents: i64) -> i64 {
        match self {
            Self::Standard { .. } => base_price_cents,
            Self::Variant { price_cents, .. } => *price_cents,
        }
    }
}

/// A recurring-order subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription ID
    pub id: SubscriptionId,
    /// Owning user
    pub user_id: UserId,
    /// Delivery address
    pub delivery_address_id: AddressId,
    /// Subscribed product lines
    pub items: Vec<LineItem>,
    /// Delivery cadence
    pub frequency: Frequency,
    /// Lifecycle status
    pub status: SubscriptionStatus,
    /// Next date the subscription is due for billing
    pub next_delivery_date: NaiveDate,
    /// Date of the last successful billing, if any
    pub last_delivery_date: Option<NaiveDate>,
    /// Opaque payment token from the tokenization stub
    pub payment_token: String,
    /// When the subscription was created
    pub created_at: DateTime<Utc>,
    /// When the subscription was last modified
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use SubscriptionStatus::*;

        assert!(Active.can_transition_to(Paused));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Cancelled));
        assert!(Pending.can_transition_to(Active));

        // Cancelled is terminal
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Paused));
        assert!(Cancelled.is_terminal());

        // No self-transitions
        assert!(!Active.can_transition_to(Active));
        assert!(!Paused.can_transition_to(Paused));
    }

    #[test]
    fn test_frequency_round_trip() {
        for (s, f) in [
            ("daily", Frequency::Daily),
            ("weekly", Frequency::Weekly),
            ("monthly", Frequency::Monthly),
        ] {
            assert_eq!(s.parse::<Frequency>().unwrap(), f);
            assert_eq!(f.to_string(), s);
        }
        assert!("fortnightly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_line_item_unit_price_resolution() {
        let product_id = ProductId::new();
        let standard = LineItem::Standard {
            product_id,
            quantity: 2,
        };
        let variant = LineItem::Variant {
            product_id,
            quantity: 1,
            weight: "1kg".to_string(),
            price_cents: 12_000,
        };

        assert_eq!(standard.unit_price_cents(10_000), 10_000);
        assert_eq!(variant.unit_price_cents(10_000), 12_000);
        assert_eq!(standard.variant_weight(), None);
        assert_eq!(variant.variant_weight(), Some("1kg"));
    }
}
