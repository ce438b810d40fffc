//! PostgreSQL order repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{OrderItemRow, OrderRow};
use crate::repo::OrderRepository;

/// PostgreSQL order repository
#[derive(Clone)]
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    /// Create a new order repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_subscription(&self, subscription_id: Uuid) -> DbResult<Vec<OrderRow>> {
        let orders = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT id, user_id, subscription_id, delivery_address_id, status,
                   payment_status, order_type, total_cents, placed_on, created_at
            FROM orders
            WHERE subscription_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn find_items(&self, order_id: Uuid) -> DbResult<Vec<OrderItemRow>> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            r#"
            SELECT id, order_id, product_id, name, unit_price_cents, quantity, variant_weight
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }
}
