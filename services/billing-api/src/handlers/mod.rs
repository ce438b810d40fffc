//! REST API handlers

pub mod health;
pub mod shared;
pub mod subscriptions;
pub mod sweep;
pub mod wallet;

pub use health::*;
pub use subscriptions::*;
pub use sweep::*;
pub use wallet::*;
