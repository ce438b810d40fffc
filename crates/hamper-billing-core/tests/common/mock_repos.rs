//! In-memory repositories for testing
//!
//! One store implements every repository trait so the billing-cycle
//! transaction can touch wallet, ledger, orders, and subscriptions together,
//! mirroring the Postgres implementation's atomicity.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use hamper_billing_core::BillingStores;
use hamper_db::{
    AddressRepository, AddressRow, ApplyCycle, CartRepository, CreateLedgerEntry,
    CreateSubscription, CreditWallet, CycleOutcome, CycleRepository, DbError, DbResult,
    LedgerEntryRow, LedgerRepository, OrderItemRow, OrderRepository, OrderRow, ProductRepository,
    ProductRow, SubscriptionItemRow, SubscriptionRepository, SubscriptionRow, UserRepository,
    UserRow,
};

/// In-memory store backing every repository trait
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, UserRow>,
    subscriptions: DashMap<Uuid, SubscriptionRow>,
    subscription_items: DashMap<Uuid, SubscriptionItemRow>,
    orders: DashMap<Uuid, OrderRow>,
    order_items: DashMap<Uuid, OrderItemRow>,
    ledger: DashMap<Uuid, LedgerEntryRow>,
    products: DashMap<Uuid, ProductRow>,
    addresses: DashMap<Uuid, AddressRow>,
    cart_items: DashMap<Uuid, Uuid>,
    /// Serializes wallet mutations the way the row lock does in Postgres
    wallet_lock: Mutex<()>,
    /// When set, the next apply_cycle fails before touching any state,
    /// simulating a crash that rolls the transaction back
    fail_next_cycle: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next billing cycle fail as if the process crashed mid-run
    pub fn fail_next_cycle(&self) {
        self.fail_next_cycle.store(true, Ordering::SeqCst);
    }
}

/// Bundle a shared store into service dependencies
pub fn stores(store: &Arc<MemoryStore>) -> BillingStores {
    BillingStores {
        users: store.clone(),
        subscriptions: store.clone(),
        orders: store.clone(),
        ledger: store.clone(),
        products: store.clone(),
        addresses: store.clone(),
        carts: store.clone(),
        cycles: store.clone(),
    }
}

/// Fixture and assertion helpers; each test binary uses its own subset
#[allow(dead_code)]
impl MemoryStore {
    pub fn add_user(&self, wallet_balance_cents: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.users.insert(
            id,
            UserRow {
                id,
                email: format!("user-{id}@example.com"),
                wallet_balance_cents,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub fn add_product(&self, name: &str, price_cents: i64) -> Uuid {
        self.add_product_with_active(name, price_cents, true)
    }

    pub fn add_product_with_active(&self, name: &str, price_cents: i64, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.products.insert(
            id,
            ProductRow {
                id,
                name: name.to_string(),
                price_cents,
                active,
            },
        );
        id
    }

    pub fn add_address(&self, user_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.addresses.insert(
            id,
            AddressRow {
                id,
                user_id,
                line1: "1 Test Lane".to_string(),
                line2: None,
                city: "Testville".to_string(),
                postal_code: "00000".to_string(),
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn add_cart_item(&self, user_id: Uuid) {
        self.cart_items.insert(Uuid::new_v4(), user_id);
    }

    pub fn remove_product(&self, id: Uuid) {
        self.products.remove(&id);
    }

    pub fn remove_address(&self, id: Uuid) {
        self.addresses.remove(&id);
    }

    // =========================================================================
    // Assertion helpers
    // =========================================================================

    pub fn balance(&self, user_id: Uuid) -> i64 {
        self.users
            .get(&user_id)
            .map(|u| u.wallet_balance_cents)
            .unwrap_or_default()
    }

    pub fn subscription(&self, id: Uuid) -> SubscriptionRow {
        self.subscriptions.get(&id).map(|r| r.clone()).unwrap()
    }

    pub fn subscription_count(&self, user_id: Uuid) -> usize {
        self.subscriptions
            .iter()
            .filter(|r| r.user_id == user_id)
            .count()
    }

    pub fn items_of(&self, subscription_id: Uuid) -> Vec<SubscriptionItemRow> {
        self.subscription_items
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .map(|r| r.clone())
            .collect()
    }

    pub fn orders_of(&self, subscription_id: Uuid) -> Vec<OrderRow> {
        self.orders
            .iter()
            .filter(|r| r.subscription_id == Some(subscription_id))
            .map(|r| r.clone())
            .collect()
    }

    pub fn ledger_of(&self, subscription_id: Uuid) -> Vec<LedgerEntryRow> {
        let mut entries: Vec<_> = self
            .ledger
            .iter()
            .filter(|r| r.subscription_id == Some(subscription_id))
            .map(|r| r.clone())
            .collect();
        entries.sort_by_key(|e| e.created_at);
        entries
    }

    pub fn cart_count(&self, user_id: Uuid) -> usize {
        self.cart_items.iter().filter(|r| *r.value() == user_id).count()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn wallet_balance(&self, id: Uuid) -> DbResult<Option<i64>> {
        Ok(self.users.get(&id).map(|u| u.wallet_balance_cents))
    }

    async fn credit_wallet(&self, credit: CreditWallet) -> DbResult<i64> {
        let _guard = self.wallet_lock.lock().unwrap();

        let balance = {
            let mut user = self.users.get_mut(&credit.user_id).ok_or(DbError::NotFound)?;
            user.wallet_balance_cents += credit.amount_cents;
            user.updated_at = Utc::now();
            user.wallet_balance_cents
        };

        self.ledger.insert(
            credit.entry_id,
            LedgerEntryRow {
                id: credit.entry_id,
                user_id: credit.user_id,
                subscription_id: None,
                amount_cents: credit.amount_cents,
                direction: "credit".to_string(),
                status: "success".to_string(),
                description: credit.description,
                created_at: Utc::now(),
            },
        );

        Ok(balance)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.subscriptions.get(&id).map(|r| r.clone()))
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        let mut rows: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_active_matching(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        frequency: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        for sub in self.subscriptions.iter() {
            if sub.user_id != user_id || sub.status != "active" || sub.frequency != frequency {
                continue;
            }
            let matched = self.subscription_items.iter().any(|item| {
                item.subscription_id == sub.id
                    && item.product_id == product_id
                    && item.variant_weight.as_deref() == variant_weight
            });
            if matched {
                return Ok(Some(sub.clone()));
            }
        }
        Ok(None)
    }

    async fn find_due(&self, as_of: NaiveDate) -> DbResult<Vec<SubscriptionRow>> {
        let mut rows: Vec<_> = self
            .subscriptions
            .iter()
            .filter(|r| r.status == "active" && r.next_delivery_date <= as_of)
            .map(|r| r.clone())
            .collect();
        rows.sort_by_key(|r| r.next_delivery_date);
        Ok(rows)
    }

    async fn find_items(&self, subscription_id: Uuid) -> DbResult<Vec<SubscriptionItemRow>> {
        Ok(self
            .subscription_items
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let row = SubscriptionRow {
            id: sub.id,
            user_id: sub.user_id,
            delivery_address_id: sub.delivery_address_id,
            frequency: sub.frequency,
            status: sub.status,
            next_delivery_date: sub.next_delivery_date,
            last_delivery_date: None,
            payment_token: sub.payment_token,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.subscriptions.insert(sub.id, row.clone());

        for item in sub.items {
            let id = Uuid::new_v4();
            self.subscription_items.insert(
                id,
                SubscriptionItemRow {
                    id,
                    subscription_id: sub.id,
                    product_id: item.product_id,
                    quantity: item.quantity as i32,
                    variant_weight: item.variant_weight,
                    variant_price_cents: item.variant_price_cents,
                },
            );
        }

        Ok(row)
    }

    async fn add_item_quantity(
        &self,
        subscription_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        quantity: u32,
    ) -> DbResult<()> {
        for mut item in self.subscription_items.iter_mut() {
            if item.subscription_id == subscription_id
                && item.product_id == product_id
                && item.variant_weight.as_deref() == variant_weight
            {
                item.quantity += quantity as i32;
            }
        }
        if let Some(mut sub) = self.subscriptions.get_mut(&subscription_id) {
            sub.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        if let Some(mut sub) = self.subscriptions.get_mut(&id) {
            sub.status = status.to_string();
            sub.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>> {
        let mut rows: Vec<_> = self
            .orders
            .iter()
            .filter(|r| r.subscription_id == Some(subscription_id))
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn find_items(&self, order_id: Uuid) -> DbResult<Vec<OrderItemRow>> {
        Ok(self
            .order_items
            .iter()
            .filter(|r| r.order_id == order_id)
            .map(|r| r.clone())
            .collect())
    }
}

#[async_trait]
impl LedgerRepository for MemoryStore {
    async fn find_by_user(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<LedgerEntryRow>> {
        let mut rows: Vec<_> = self
            .ledger
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn create(&self, entry: CreateLedgerEntry) -> DbResult<LedgerEntryRow> {
        let row = LedgerEntryRow {
            id: entry.id,
            user_id: entry.user_id,
            subscription_id: entry.subscription_id,
            amount_cents: entry.amount_cents,
            direction: entry.direction,
            status: entry.status,
            description: entry.description,
            created_at: Utc::now(),
        };
        self.ledger.insert(entry.id, row.clone());
        Ok(row)
    }

    async fn count_failures_since_success(&self, subscription_id: Uuid) -> DbResult<i64> {
        let entries: Vec<_> = self
            .ledger
            .iter()
            .filter(|r| r.subscription_id == Some(subscription_id) && r.direction == "debit")
            .map(|r| r.clone())
            .collect();

        let last_success = entries
            .iter()
            .filter(|e| e.status == "success")
            .map(|e| e.created_at)
            .max();

        let count = entries
            .iter()
            .filter(|e| e.status == "failed")
            .filter(|e| last_success.is_none_or(|t| e.created_at > t))
            .count();

        Ok(count as i64)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<ProductRow>> {
        Ok(self.products.get(&id).map(|r| r.clone()))
    }
}

#[async_trait]
impl AddressRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AddressRow>> {
        Ok(self.addresses.get(&id).map(|r| r.clone()))
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddressRow>> {
        Ok(self
            .addresses
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.clone())
            .collect())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn clear_for_user(&self, user_id: Uuid) -> DbResult<u64> {
        let ids: Vec<Uuid> = self
            .cart_items
            .iter()
            .filter(|r| *r.value() == user_id)
            .map(|r| *r.key())
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            self.cart_items.remove(&id);
        }
        Ok(count)
    }
}

#[async_trait]
impl CycleRepository for MemoryStore {
    async fn apply_cycle(&self, cycle: ApplyCycle) -> DbResult<CycleOutcome> {
        if self.fail_next_cycle.swap(false, Ordering::SeqCst) {
            // Everything in the transaction rolls back, including the parts
            // that would already have executed
            return Err(DbError::Sqlx(sqlx::Error::WorkerCrashed));
        }

        let _guard = self.wallet_lock.lock().unwrap();

        {
            let sub = self
                .subscriptions
                .get(&cycle.subscription_id)
                .ok_or(DbError::NotFound)?;
            if sub.status != "active"
                || sub.next_delivery_date != cycle.expected_next_delivery_date
            {
                return Ok(CycleOutcome::AlreadyBilled);
            }
        }

        {
            let mut user = self.users.get_mut(&cycle.user_id).ok_or(DbError::NotFound)?;
            if user.wallet_balance_cents < cycle.total_cents {
                return Ok(CycleOutcome::InsufficientFunds {
                    balance_cents: user.wallet_balance_cents,
                });
            }
            user.wallet_balance_cents -= cycle.total_cents;
            user.updated_at = Utc::now();
        }

        self.ledger.insert(
            cycle.ledger_entry_id,
            LedgerEntryRow {
                id: cycle.ledger_entry_id,
                user_id: cycle.user_id,
                subscription_id: Some(cycle.subscription_id),
                amount_cents: cycle.total_cents,
                direction: "debit".to_string(),
                status: "success".to_string(),
                description: cycle.description.clone(),
                created_at: Utc::now(),
            },
        );

        let order = &cycle.order;
        self.orders.insert(
            order.id,
            OrderRow {
                id: order.id,
                user_id: order.user_id,
                subscription_id: order.subscription_id,
                delivery_address_id: order.delivery_address_id,
                status: order.status.clone(),
                payment_status: order.payment_status.clone(),
                order_type: order.order_type.clone(),
                total_cents: order.total_cents,
                placed_on: order.placed_on,
                created_at: Utc::now(),
            },
        );
        for item in &order.items {
            let id = Uuid::new_v4();
            self.order_items.insert(
                id,
                OrderItemRow {
                    id,
                    order_id: order.id,
                    product_id: item.product_id,
                    name: item.name.clone(),
                    unit_price_cents: item.unit_price_cents,
                    quantity: item.quantity as i32,
                    variant_weight: item.variant_weight.clone(),
                },
            );
        }

        if let Some(mut sub) = self.subscriptions.get_mut(&cycle.subscription_id) {
            sub.next_delivery_date = cycle.next_delivery_date;
            sub.last_delivery_date = Some(cycle.billed_on);
            sub.updated_at = Utc::now();
        }

        Ok(CycleOutcome::Applied { order_id: order.id })
    }
}
