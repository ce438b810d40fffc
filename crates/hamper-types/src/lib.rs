//! Hamper Types - Shared domain types
//!
//! This crate contains domain types used across Hamper services:
//! - User identity and wallet balance
//! - Subscriptions, delivery cadence, and line items
//! - Wallet ledger entries
//! - Order snapshots emitted by the billing sweep
//! - Product catalog and delivery address lookups

pub mod catalog;
pub mod ledger;
pub mod order;
pub mod subscription;
pub mod user;

pub use catalog::*;
pub use ledger::*;
pub use order::*;
pub use subscription::*;
pub use user::*;
