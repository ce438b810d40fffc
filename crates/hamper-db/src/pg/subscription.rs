//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{SubscriptionItemRow, SubscriptionRow};
use crate::repo::{CreateSubscription, SubscriptionRepository};

/// PostgreSQL subscription repository
#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    /// Create a new subscription repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, delivery_address_id, frequency, status,
                   next_delivery_date, last_delivery_date, payment_token,
                   created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, delivery_address_id, frequency, status,
                   next_delivery_date, last_delivery_date, payment_token,
                   created_at, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn find_active_matching(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        frequency: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT s.id, s.user_id, s.delivery_address_id, s.frequency, s.status,
                   s.next_delivery_date, s.last_delivery_date, s.payment_token,
                   s.created_at, s.updated_at
            FROM subscriptions s
            JOIN subscription_items i ON i.subscription_id = s.id
            WHERE s.user_id = $1
              AND s.status = 'active'
              AND s.frequency = $2
              AND i.product_id = $3
              AND i.variant_weight IS NOT DISTINCT FROM $4
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(frequency)
        .bind(product_id)
        .bind(variant_weight)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sub)
    }

    async fn find_due(&self, as_of: NaiveDate) -> DbResult<Vec<SubscriptionRow>> {
        // `<=` keeps missed sweep ticks self-healing
        let subs = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, delivery_address_id, frequency, status,
                   next_delivery_date, last_delivery_date, payment_token,
                   created_at, updated_at
            FROM subscriptions
            WHERE status = 'active' AND next_delivery_date <= $1
            ORDER BY next_delivery_date
            "#,
        )
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(subs)
    }

    async fn find_items(&self, subscription_id: Uuid) -> DbResult<Vec<SubscriptionItemRow>> {
        let items = sqlx::query_as::<_, SubscriptionItemRow>(
            r#"
            SELECT id, subscription_id, product_id, quantity, variant_weight, variant_price_cents
            FROM subscription_items
            WHERE subscription_id = $1
            ORDER BY id
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    async fn create(&self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions
                (id, user_id, delivery_address_id, frequency, status,
                 next_delivery_date, payment_token)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, delivery_address_id, frequency, status,
                      next_delivery_date, last_delivery_date, payment_token,
                      created_at, updated_at
            "#,
        )
        .bind(sub.id)
        .bind(sub.user_id)
        .bind(sub.delivery_address_id)
        .bind(&sub.frequency)
        .bind(&sub.status)
        .bind(sub.next_delivery_date)
        .bind(&sub.payment_token)
        .fetch_one(&mut *tx)
        .await?;

        for item in &sub.items {
            sqlx::query(
                r#"
                INSERT INTO subscription_items
                    (id, subscription_id, product_id, quantity, variant_weight, variant_price_cents)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(sub.id)
            .bind(item.product_id)
            .bind(item.quantity as i32)
            .bind(&item.variant_weight)
            .bind(item.variant_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row)
    }

    async fn add_item_quantity(
        &self,
        subscription_id: Uuid,
        product_id: Uuid,
        variant_weight: Option<&str>,
        quantity: u32,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE subscription_items
            SET quantity = quantity + $1
            WHERE subscription_id = $2
              AND product_id = $3
              AND variant_weight IS NOT DISTINCT FROM $4
            "#,
        )
        .bind(quantity as i32)
        .bind(subscription_id)
        .bind(product_id)
        .bind(variant_weight)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE subscriptions SET updated_at = NOW() WHERE id = $1")
            .bind(subscription_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_status(&self, id: Uuid, status: &str) -> DbResult<()> {
        sqlx::query("UPDATE subscriptions SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
