//! PostgreSQL implementation of the campaign repository

use crate::domain::campaign::aggregate::Campaign;
use crate::domain::campaign::repository::CampaignRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CampaignId};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::error;

pub struct PgCampaignRepository {
    pool: PgPool,
}

impl PgCampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(data: serde_json::Value) -> Result<Campaign> {
        serde_json::from_value(data)
            .map_err(|e| DomainError::Internal(format!("corrupt campaign document: {}", e)))
    }

    fn db_err(e: sqlx::Error) -> DomainError {
        error!("database error: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }
}

#[async_trait]
impl CampaignRepository for PgCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> Result<()> {
        let data = serde_json::to_value(campaign)
            .map_err(|e| DomainError::Internal(format!("serialize campaign: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO campaigns (id, business_id, status, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(campaign.id().as_uuid())
        .bind(campaign.business_id().as_uuid())
        .bind(campaign.status().as_str())
        .bind(data)
        .bind(campaign.created_at())
        .bind(campaign.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query("SELECT data FROM campaigns WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;

        row.map(|r| Self::decode(r.get("data"))).transpose()
    }

    async fn update(&self, campaign: &Campaign) -> Result<()> {
        let data = serde_json::to_value(campaign)
            .map_err(|e| DomainError::Internal(format!("serialize campaign: {}", e)))?;

        let result = sqlx::query(
            "UPDATE campaigns SET status = $2, data = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(campaign.id().as_uuid())
        .bind(campaign.status().as_str())
        .bind(data)
        .bind(campaign.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(campaign.id().to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &CampaignId) -> Result<()> {
        // Calls keep their campaign_id; there is no cascade.
        sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn list_by_business(&self, business_id: &BusinessId) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT data FROM campaigns WHERE business_id = $1 ORDER BY created_at DESC",
        )
        .bind(business_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        rows.into_iter()
            .map(|r| Self::decode(r.get("data")))
            .collect()
    }
}
