//! PostgreSQL repository implementations

mod address;
mod cart;
mod cycle;
mod ledger;
mod order;
mod product;
mod subscription;
mod user;

pub use address::PgAddressRepository;
pub use cart::PgCartRepository;
pub use cycle::PgCycleRepository;
pub use ledger::PgLedgerRepository;
pub use order::PgOrderRepository;
pub use product::PgProductRepository;
pub use subscription::PgSubscriptionRepository;
pub use user::PgUserRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub users: PgUserRepository,
    pub subscriptions: PgSubscriptionRepository,
    pub orders: PgOrderRepository,
    pub ledger: PgLedgerRepository,
    pub products: PgProductRepository,
    pub addresses: PgAddressRepository,
    pub carts: PgCartRepository,
    pub cycles: PgCycleRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            subscriptions: PgSubscriptionRepository::new(pool.clone()),
            orders: PgOrderRepository::new(pool.clone()),
            ledger: PgLedgerRepository::new(pool.clone()),
            products: PgProductRepository::new(pool.clone()),
            addresses: PgAddressRepository::new(pool.clone()),
            carts: PgCartRepository::new(pool.clone()),
            cycles: PgCycleRepository::new(pool),
        }
    }
}
