//! PostgreSQL billing-cycle repository implementation
//!
//! One billing cycle is one transaction: due-date advance, wallet debit,
//! success ledger entry, and order snapshot commit together or not at all.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repo::{ApplyCycle, CycleOutcome, CycleRepository};

/// PostgreSQL billing-cycle repository
#[derive(Clone)]
pub struct PgCycleRepository {
    pool: PgPool,
}

impl PgCycleRepository {
    /// Create a new billing-cycle repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CycleRepository for PgCycleRepository {
    async fn apply_cycle(&self, cycle: ApplyCycle) -> DbResult<CycleOutcome> {
        let mut tx = self.pool.begin().await?;

        // Compare-and-set on the due date. A retried crash or a concurrent
        // sweep sees zero rows here and the cycle is not billed again.
        let advanced = sqlx::query(
            r#"
            UPDATE subscriptions
            SET next_delivery_date = $1, last_delivery_date = $2, updated_at = NOW()
            WHERE id = $3 AND status = 'active' AND next_delivery_date = $4
            "#,
        )
        .bind(cycle.next_delivery_date)
        .bind(cycle.billed_on)
        .bind(cycle.subscription_id)
        .bind(cycle.expected_next_delivery_date)
        .execute(&mut *tx)
        .await?;

        if advanced.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(CycleOutcome::AlreadyBilled);
        }

        // Debit-if-sufficient: the guard serializes concurrent debits on the
        // user row, so two cycles can never both spend the same balance.
        let debited = sqlx::query(
            r#"
            UPDATE users
            SET wallet_balance_cents = wallet_balance_cents - $1, updated_at = NOW()
            WHERE id = $2 AND wallet_balance_cents >= $1
            "#,
        )
        .bind(cycle.total_cents)
        .bind(cycle.user_id)
        .execute(&mut *tx)
        .await?;

        if debited.rows_affected() == 0 {
            tx.rollback().await?;

            let balance: Option<(i64,)> =
                sqlx::query_as("SELECT wallet_balance_cents FROM users WHERE id = $1")
                    .bind(cycle.user_id)
                    .fetch_optional(&self.pool)
                    .await?;

            return Ok(CycleOutcome::InsufficientFunds {
                balance_cents: balance.map(|(b,)| b).unwrap_or(0),
            });
        }

        sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (id, user_id, subscription_id, amount_cents, direction, status, description)
            VALUES ($1, $2, $3, $4, 'debit', 'success', $5)
            "#,
        )
        .bind(cycle.ledger_entry_id)
        .bind(cycle.user_id)
        .bind(cycle.subscription_id)
        .bind(cycle.total_cents)
        .bind(&cycle.description)
        .execute(&mut *tx)
        .await?;

        let order = &cycle.order;
        sqlx::query(
            r#"
            INSERT INTO orders
                (id, user_id, subscription_id, delivery_address_id, status,
                 payment_status, order_type, total_cents, placed_on)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.subscription_id)
        .bind(order.delivery_address_id)
        .bind(&order.status)
        .bind(&order.payment_status)
        .bind(&order.order_type)
        .bind(order.total_cents)
        .bind(order.placed_on)
        .execute(&mut *tx)
        .await?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items
                    (id, order_id, product_id, name, unit_price_cents, quantity, variant_weight)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.unit_price_cents)
            .bind(item.quantity as i32)
            .bind(&item.variant_weight)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(CycleOutcome::Applied { order_id: order.id })
    }
}
