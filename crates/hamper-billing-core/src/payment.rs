//! Payment tokenization stub
//!
//! Real gateway integration is out of scope; enrollment exchanges the
//! caller's payment method for an opaque token stored on the subscription.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment method supplied at enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Card, identified by its last four digits only
    Card {
        /// Last four digits
        last4: String,
    },
    /// UPI handle
    Upi {
        /// Handle, e.g. "name@bank"
        handle: String,
    },
    /// The prepaid wallet itself
    Wallet,
}

/// Exchanges payment methods for opaque tokens
#[derive(Debug, Clone, Default)]
pub struct PaymentTokenizer;

impl PaymentTokenizer {
    /// Create a new tokenizer
    pub fn new() -> Self {
        Self
    }

    /// Produce an opaque token for the given method
    pub fn tokenize(&self, method: &PaymentMethod) -> String {
        let kind = match method {
            PaymentMethod::Card { .. } => "card",
            PaymentMethod::Upi { .. } => "upi",
            PaymentMethod::Wallet => "wallet",
        };
        format!("tok_{kind}_{}", Uuid::new_v4().simple())
    }
}
