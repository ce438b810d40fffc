//! Billing service - ties together enrollment, lifecycle transitions,
//! wallet operations, and the billing sweep

use std::sync::Arc;

use moka::future::Cache;
use uuid::Uuid;

use hamper_db::{
    AddressRepository, CartRepository, CreditWallet, CycleRepository, LedgerRepository,
    OrderRepository, ProductRepository, Repositories, SubscriptionRepository, SubscriptionRow,
    UserRepository,
};
use hamper_types::{
    Address, LedgerEntry, LedgerEntryId, Order, Product, ProductId, Subscription, SubscriptionId,
    SubscriptionStatus, UserId,
};

use crate::{config::BillingConfig, error::BillingError, payment::PaymentTokenizer};

/// Repository handles the billing service works against
///
/// Trait objects so tests can substitute in-memory stores for the Postgres
/// implementations.
#[derive(Clone)]
pub struct BillingStores {
    pub users: Arc<dyn UserRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub addresses: Arc<dyn AddressRepository>,
    pub carts: Arc<dyn CartRepository>,
    pub cycles: Arc<dyn CycleRepository>,
}

impl From<&Repositories> for BillingStores {
    fn from(repos: &Repositories) -> Self {
        Self {
            users: Arc::new(repos.users.clone()),
            subscriptions: Arc::new(repos.subscriptions.clone()),
            orders: Arc::new(repos.orders.clone()),
            ledger: Arc::new(repos.ledger.clone()),
            products: Arc::new(repos.products.clone()),
            addresses: Arc::new(repos.addresses.clone()),
            carts: Arc::new(repos.carts.clone()),
            cycles: Arc::new(repos.cycles.clone()),
        }
    }
}

/// One subscription with its billing history and the user's address options
#[derive(Debug, Clone)]
pub struct SubscriptionDetail {
    /// The subscription
    pub subscription: Subscription,
    /// Orders billed for it, newest first
    pub orders: Vec<Order>,
    /// The user's delivery addresses
    pub addresses: Vec<Address>,
}

/// Wallet balance with recent ledger entries
#[derive(Debug, Clone)]
pub struct WalletView {
    /// Spendable balance in cents
    pub balance_cents: i64,
    /// Recent entries, newest first
    pub entries: Vec<LedgerEntry>,
}

/// Billing service
pub struct BillingService {
    pub(crate) stores: BillingStores,
    pub(crate) product_cache: Cache<Uuid, Product>,
    pub(crate) tokenizer: PaymentTokenizer,
    pub(crate) config: BillingConfig,
}

impl BillingService {
    /// Create a new billing service
    pub fn new(stores: BillingStores, config: BillingConfig) -> Self {
        Self {
            product_cache: Cache::builder()
                .time_to_live(config.product_cache_ttl)
                .max_capacity(config.product_cache_capacity)
                .build(),
            tokenizer: PaymentTokenizer::new(),
            stores,
            config,
        }
    }

    /// The active configuration
    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// List a user's subscriptions, newest first
    pub async fn list_subscriptions(
        &self,
        user_id: UserId,
    ) -> Result<Vec<Subscription>, BillingError> {
        let rows = self.stores.subscriptions.find_by_user(user_id.0).await?;

        let mut subscriptions = Vec::with_capacity(rows.len());
        for row in rows {
            subscriptions.push(self.load_subscription(row).await?);
        }

        Ok(subscriptions)
    }

    /// Fetch one subscription with its billing history and address options
    pub async fn subscription_detail(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Result<SubscriptionDetail, BillingError> {
        let subscription = self.owned_subscription(user_id, subscription_id).await?;

        let order_rows = self
            .stores
            .orders
            .find_by_subscription(subscription_id.0)
            .await?;
        let mut orders = Vec::with_capacity(order_rows.len());
        for row in order_rows {
            let items = self.stores.orders.find_items(row.id).await?;
            orders.push(row.into_order(items)?);
        }

        let addresses = self
            .stores
            .addresses
            .find_by_user(user_id.0)
            .await?
            .into_iter()
            .map(|row| row.into_address())
            .collect();

        Ok(SubscriptionDetail {
            subscription,
            orders,
            addresses,
        })
    }

    /// Wallet balance with the most recent ledger entries
    pub async fn wallet(&self, user_id: UserId, limit: i64) -> Result<WalletView, BillingError> {
        let balance_cents = self
            .stores
            .users
            .wallet_balance(user_id.0)
            .await?
            .ok_or(BillingError::UserNotFound)?;

        let entries = self.stores.ledger.find_by_user(user_id.0, limit).await?;
        let entries = entries
            .into_iter()
            .map(|row| row.into_entry())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(WalletView {
            balance_cents,
            entries,
        })
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// Credit the wallet. Returns the new balance.
    pub async fn top_up(&self, user_id: UserId, amount_cents: i64) -> Result<i64, BillingError> {
        if amount_cents <= 0 {
            return Err(BillingError::Validation(
                "top-up amount must be positive".to_string(),
            ));
        }

        let balance = self
            .stores
            .users
            .credit_wallet(CreditWallet {
                entry_id: LedgerEntryId::new().0,
                user_id: user_id.0,
                amount_cents,
                description: "wallet top-up".to_string(),
            })
            .await
            .map_err(|e| match e {
                hamper_db::DbError::NotFound => BillingError::UserNotFound,
                other => BillingError::Database(other),
            })?;

        tracing::info!(user_id = %user_id, amount_cents, balance, "Wallet credited");

        Ok(balance)
    }

    // =========================================================================
    // Lifecycle transitions
    // =========================================================================

    /// Cancel a subscription. Terminal; there is no refund of prior cycles.
    pub async fn cancel(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, BillingError> {
        self.set_status(user_id, subscription_id, SubscriptionStatus::Cancelled)
            .await
    }

    /// Pause a subscription, excluding it from the billing sweep
    pub async fn pause(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, BillingError> {
        self.set_status(user_id, subscription_id, SubscriptionStatus::Paused)
            .await
    }

    /// Resume a paused subscription
    pub async fn resume(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, BillingError> {
        self.set_status(user_id, subscription_id, SubscriptionStatus::Active)
            .await
    }

    async fn set_status(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
        to: SubscriptionStatus,
    ) -> Result<Subscription, BillingError> {
        let subscription = self.owned_subscription(user_id, subscription_id).await?;

        if !subscription.status.can_transition_to(to) {
            return Err(BillingError::InvalidTransition {
                from: subscription.status,
                to,
            });
        }

        self.stores
            .subscriptions
            .update_status(subscription_id.0, &to.to_string())
            .await?;

        tracing::info!(
            subscription_id = %subscription_id,
            from = %subscription.status,
            to = %to,
            "Subscription status changed"
        );

        let row = self
            .stores
            .subscriptions
            .find_by_id(subscription_id.0)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)?;
        self.load_subscription(row).await
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Fetch a subscription, treating another user's subscription as absent
    async fn owned_subscription(
        &self,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Result<Subscription, BillingError> {
        let row = self
            .stores
            .subscriptions
            .find_by_id(subscription_id.0)
            .await?
            .ok_or(BillingError::SubscriptionNotFound)?;

        if row.user_id != user_id.0 {
            return Err(BillingError::SubscriptionNotFound);
        }

        self.load_subscription(row).await
    }

    pub(crate) async fn load_subscription(
        &self,
        row: SubscriptionRow,
    ) -> Result<Subscription, BillingError> {
        let items = self.stores.subscriptions.find_items(row.id).await?;
        Ok(row.into_subscription(items)?)
    }

    /// Catalog lookup through the sweep-lifetime cache
    pub(crate) async fn lookup_product(
        &self,
        product_id: ProductId,
    ) -> Result<Option<Product>, BillingError> {
        if let Some(product) = self.product_cache.get(&product_id.0).await {
            return Ok(Some(product));
        }

        let Some(row) = self.stores.products.find_by_id(product_id.0).await? else {
            return Ok(None);
        };

        let product = row.into_product();
        self.product_cache
            .insert(product_id.0, product.clone())
            .await;

        Ok(Some(product))
    }
}

impl std::fmt::Debug for BillingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
