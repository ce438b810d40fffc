//! Billing errors

use hamper_types::SubscriptionStatus;
use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Malformed enrollment payload or unknown product/address; nothing
    /// was mutated
    #[error("validation failed: {0}")]
    Validation(String),

    /// User not found
    #[error("user not found")]
    UserNotFound,

    /// Subscription not found (or not owned by the requesting user)
    #[error("subscription not found")]
    SubscriptionNotFound,

    /// Requested status change is not permitted by the state machine
    #[error("cannot transition subscription from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: SubscriptionStatus,
        /// Requested status
        to: SubscriptionStatus,
    },

    /// Wallet balance below the cycle total. Sweep-internal: recorded as a
    /// failed ledger entry and retried next tick, never surfaced to a caller
    #[error("insufficient funds: required {required_cents}, balance {balance_cents}")]
    InsufficientFunds {
        /// Cycle total in cents
        required_cents: i64,
        /// Balance observed at decision time
        balance_cents: i64,
    },

    /// A referenced product or address vanished; the cycle is skipped and
    /// the sweep continues
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] hamper_db::DbError),
}
