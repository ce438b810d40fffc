//! Hamper Billing Core
//!
//! The recurring-order billing engine:
//! - Subscription lifecycle state machine
//! - Enrollment conflict detection and merge
//! - The idempotent billing sweep that converts due subscriptions into
//!   orders while debiting the wallet ledger
//! - Cadence date arithmetic and the order snapshot emitter

pub mod cadence;
pub mod config;
pub mod emitter;
pub mod enroll;
pub mod error;
pub mod payment;
pub mod policy;
pub mod service;
pub mod sweep;

pub use config::BillingConfig;
pub use enroll::{EnrollmentOutcome, EnrollmentRequest, SubscriptionConflict};
pub use error::BillingError;
pub use payment::{PaymentMethod, PaymentTokenizer};
pub use policy::FailurePolicy;
pub use service::{BillingService, BillingStores, SubscriptionDetail, WalletView};
pub use sweep::{CycleResult, CycleStatus, SweepReport};
