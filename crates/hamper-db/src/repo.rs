//! Repository traits
//!
//! Define async repository interfaces for database operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// User repository trait
///
/// User CRUD belongs to the profile service; billing only reads users and
/// moves their wallet balance.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Read the current wallet balance
    async fn wallet_balance(&self, id: Uuid) -> DbResult<Option<i64>>;

    /// Credit the wallet: insert the credit ledger entry and increment the
    /// balance in one transaction. Returns the new balance.
    async fn credit_wallet(&self, credit: CreditWallet) -> DbResult<i64>;
}

/// Wallet credit input
#[derive(Debug, Clone)]
pub struct CreditWallet {
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub description: String,
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Find a subscription by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find all subscriptions for a user, newest first
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>>;

    /// Find the active subscription matching (user, product, variant weight,
    /// frequency), if one exists
    async fn find_active_matching(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        frequency: &str,
    ) -> DbResult<Option<SubscriptionRow>>;

    /// Find active subscriptions due at or before the given date
    async fn find_due(&self, as_of: NaiveDate) -> DbResult<Vec<SubscriptionRow>>;

    /// Fetch the line items of a subscription
    async fn find_items(&self, subscription_id: Uuid) -> DbResult<Vec<SubscriptionItemRow>>;

    /// Create a new subscription with its line items
    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow>;

    /// Increase the quantity of a matching line item (enrollment merge)
    async fn add_item_quantity(
        &self,
        subscription_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        quantity: u32,
    ) -> DbResult<()>;

    /// Update subscription status
    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()>;
}

/// Create subscription input
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub delivery_address_id: Uuid,
    pub frequency: String,
    pub status: String,
    pub next_delivery_date: NaiveDate,
    pub payment_token: String,
    pub items: Vec<CreateSubscriptionItem>,
}

/// Create subscription line-item input
#[derive(Debug, Clone)]
pub struct CreateSubscriptionItem {
    pub product_id: Uuid,
    pub quantity: u32,
    pub variant_weight: Option<String>,
    pub variant_price_cents: Option<i64>,
}

/// Order repository trait
///
/// Subscription orders are inserted by [`CycleRepository::apply_cycle`];
/// this trait covers the read side.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find orders billed for a subscription, newest first
    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>>;

    /// Fetch the line items of an order
    async fn find_items(&self, order_id: Uuid) -> DbResult<Vec<OrderItemRow>>;
}

/// Order snapshot input, consumed by [`CycleRepository::apply_cycle`]
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub delivery_address_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub order_type: String,
    pub total_cents: i64,
    pub placed_on: NaiveDate,
    pub items: Vec<CreateOrderItem>,
}

/// Order line-item input
#[derive(Debug, Clone)]
pub struct CreateOrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: u32,
    pub variant_weight: Option<String>,
}

/// Ledger repository trait
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Find entries for a user, newest first
    async fn find_by_user(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<LedgerEntryRow>>;

    /// Append an entry without touching the wallet balance (failed billing
    /// attempts are recorded this way)
    async fn create(&self, entry: CreateLedgerEntry) -> DbResult<LedgerEntryRow>;

    /// Count failed billing debits for a subscription since its most recent
    /// successful one
    async fn count_failures_since_success(&self, subscription_id: Uuid) -> DbResult<i64>;
}

/// Create ledger entry input
#[derive(Debug, Clone)]
pub struct CreateLedgerEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Option<Uuid>,
    pub amount_cents: i64,
    pub direction: String,
    pub status: String,
    pub description: String,
}

/// Product repository trait (read-only collaborator)
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find a product by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProductRow>>;
}

/// Address repository trait (read-only collaborator)
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Find an address by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AddressRow>>;

    /// Find all addresses for a user
    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddressRow>>;
}

/// Cart repository trait (side-effect boundary: enrollment clears the cart)
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Remove all cart rows for a user; returns how many were removed
    async fn clear_for_user(&self, user_id: Uuid) -> DbResult<u64>;
}

/// One subscription's billing cycle, applied as a single transaction
///
/// The transaction boundary of the sweep: balance debit, success ledger
/// entry, order snapshot, and due-date advance are visible together or not
/// at all. `expected_next_delivery_date` is compared-and-set so a crashed
/// and retried sweep, or two concurrent sweeps, cannot bill the same cycle
/// twice.
#[async_trait]
pub trait CycleRepository: Send + Sync {
    /// Apply one billing cycle atomically
    async fn apply_cycle(&self, cycle: ApplyCycle) -> DbResult<CycleOutcome>;
}

/// Billing cycle input
#[derive(Debug, Clone)]
pub struct ApplyCycle {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub total_cents: i64,
    /// The due date this cycle is billing; the advance is rejected if the
    /// row has already moved past it
    pub expected_next_delivery_date: NaiveDate,
    pub next_delivery_date: NaiveDate,
    pub billed_on: NaiveDate,
    pub ledger_entry_id: Uuid,
    pub description: String,
    pub order: CreateOrder,
}

/// Result of applying a billing cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Debit, ledger entry, order, and date advance all committed
    Applied {
        /// The created order
        order_id: Uuid,
    },
    /// Balance was below the cycle total; nothing committed
    InsufficientFunds {
        /// Balance observed at decision time
        balance_cents: i64,
    },
    /// The subscription's due date had already advanced past the expected
    /// value; nothing committed
    AlreadyBilled,
}
