//! Hamper DB - Database abstractions
//!
//! SQLx-based database layer for Hamper services.
//!
//! # Example
//!
//! ```rust,ignore
//! use hamper_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/hamper").await?;
//! let repos = Repositories::new(pool);
//!
//! // Use repositories
//! let due = repos.subscriptions.find_due(today).await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, DbPool};
pub use repo::*;
