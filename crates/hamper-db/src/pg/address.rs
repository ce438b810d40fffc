//! PostgreSQL address repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::AddressRow;
use crate::repo::AddressRepository;

/// PostgreSQL address repository
#[derive(Clone)]
pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    /// Create a new address repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<AddressRow>> {
        let address = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT id, user_id, line1, line2, city, postal_code, created_at
            FROM addresses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(address)
    }

    async fn find_by_user(&self, user_id: Uuid) -> DbResult<Vec<AddressRow>> {
        let addresses = sqlx::query_as::<_, AddressRow>(
            r#"
            SELECT id, user_id, line1, line2, city, postal_code, created_at
            FROM addresses
            WHERE user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(addresses)
    }
}
