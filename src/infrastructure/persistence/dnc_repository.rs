//! PostgreSQL implementation of the do-not-call repository

use crate::domain::dnc::{DncEntry, DoNotCallRepository};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, PhoneNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::error;

pub struct PgDncRepository {
    pool: PgPool,
}

impl PgDncRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn db_err(e: sqlx::Error) -> DomainError {
        error!("database error: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }
}

#[async_trait]
impl DoNotCallRepository for PgDncRepository {
    async fn check(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM do_not_call_entries WHERE business_id = $1 AND phone = $2",
        )
        .bind(business_id.as_uuid())
        .bind(phone.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(found.is_some())
    }

    async fn add(
        &self,
        business_id: &BusinessId,
        phone: &PhoneNumber,
        reason: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO do_not_call_entries (business_id, phone, reason, added_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (business_id, phone) DO UPDATE SET reason = $3, added_at = $4
            "#,
        )
        .bind(business_id.as_uuid())
        .bind(phone.as_str())
        .bind(reason)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn remove(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM do_not_call_entries WHERE business_id = $1 AND phone = $2",
        )
        .bind(business_id.as_uuid())
        .bind(phone.as_str())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, business_id: &BusinessId) -> Result<Vec<DncEntry>> {
        let rows = sqlx::query(
            "SELECT phone, reason, added_at FROM do_not_call_entries WHERE business_id = $1",
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        rows.into_iter()
            .map(|row| {
                let phone = PhoneNumber::parse(row.get::<String, _>("phone").as_str())
                    .map_err(DomainError::Internal)?;
                Ok(DncEntry {
                    phone,
                    reason: row.get("reason"),
                    added_at: row.get::<DateTime<Utc>, _>("added_at"),
                })
            })
            .collect()
    }
}
