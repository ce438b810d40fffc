//! PostgreSQL ledger repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::LedgerEntryRow;
use crate::repo::{CreateLedgerEntry, LedgerRepository};

/// PostgreSQL ledger repository
#[derive(Clone)]
pub struct PgLedgerRepository {
    pool: PgPool,
}

impl PgLedgerRepository {
    /// Create a new ledger repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PgLedgerRepository {
    async fn find_by_user(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<LedgerEntryRow>> {
        let entries = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            SELECT id, user_id, subscription_id, amount_cents, direction, status,
                   description, created_at
            FROM ledger_entries
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn create(&self, entry: CreateLedgerEntry) -> DbResult<LedgerEntryRow> {
        let row = sqlx::query_as::<_, LedgerEntryRow>(
            r#"
            INSERT INTO ledger_entries
                (id, user_id, subscription_id, amount_cents, direction, status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, subscription_id, amount_cents, direction, status,
                      description, created_at
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.subscription_id)
        .bind(entry.amount_cents)
        .bind(&entry.direction)
        .bind(&entry.status)
        .bind(&entry.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn count_failures_since_success(&self, subscription_id: Uuid) -> DbResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM ledger_entries
            WHERE subscription_id = $1
              AND direction = 'debit'
              AND status = 'failed'
              AND created_at > COALESCE(
                  (SELECT MAX(created_at) FROM ledger_entries
                   WHERE subscription_id = $1 AND direction = 'debit' AND status = 'success'),
                  '-infinity'::timestamptz)
            "#,
        )
        .bind(subscription_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}
