//! PostgreSQL user repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::UserRow;
use crate::repo::{CreditWallet, UserRepository};

/// PostgreSQL user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, wallet_balance_cents, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn wallet_balance(&self, id: Uuid) -> DbResult<Option<i64>> {
        let balance: Option<(i64,)> =
            sqlx::query_as("SELECT wallet_balance_cents FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(balance.map(|(b,)| b))
    }

    async fn credit_wallet(&self, credit: CreditWallet) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let balance: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET wallet_balance_cents = wallet_balance_cents + $1, updated_at = NOW()
            WHERE id = $2
            RETURNING wallet_balance_cents
            "#,
        )
        .bind(credit.amount_cents)
        .bind(credit.user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((balance,)) = balance else {
            tx.rollback().await?;
            return Err(DbError::NotFound);
        };

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, user_id, amount_cents, direction, status, description)
            VALUES ($1, $2, $3, 'credit', 'success', $4)
            "#,
        )
        .bind(credit.entry_id)
        .bind(credit.user_id)
        .bind(credit.amount_cents)
        .bind(&credit.description)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(balance)
    }
}
