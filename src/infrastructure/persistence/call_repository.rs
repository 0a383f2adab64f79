//! PostgreSQL implementation of the call repository
//!
//! The aggregate is stored as a JSONB document alongside the scalar
//! columns the scheduler queries on. The claim runs in a transaction
//! that row-locks the business's dial-slot row, so the concurrency
//! check and the Scheduled -> Dialing transition are atomic across
//! workers.

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::repository::CallRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, CampaignId, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, error};
use uuid::Uuid;

const ACTIVE_STATUSES: &[&str] = &["dialing", "ringing", "connected", "in_progress"];
const CLAIMABLE_STATUSES: &[&str] = &["scheduled", "queued"];
const TERMINAL_STATUSES: &[&str] =
    &["completed", "failed", "no_answer", "busy", "voicemail", "cancelled"];

pub struct PgCallRepository {
    pool: PgPool,
}

impl PgCallRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(data: serde_json::Value) -> Result<OutboundCall> {
        serde_json::from_value(data)
            .map_err(|e| DomainError::Internal(format!("corrupt call document: {}", e)))
    }

    fn encode(call: &OutboundCall) -> Result<serde_json::Value> {
        serde_json::to_value(call)
            .map_err(|e| DomainError::Internal(format!("serialize call: {}", e)))
    }

    fn db_err(e: sqlx::Error) -> DomainError {
        error!("database error: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }

    async fn fetch_documents(
        &self,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> Result<Vec<OutboundCall>> {
        let rows = query.fetch_all(&self.pool).await.map_err(Self::db_err)?;
        rows.into_iter()
            .map(|row| Self::decode(row.get::<serde_json::Value, _>("data")))
            .collect()
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    async fn create(&self, call: &OutboundCall) -> Result<()> {
        debug!(call_id = %call.id(), "inserting call");
        sqlx::query(
            r#"
            INSERT INTO outbound_calls (
                id, business_id, campaign_id, status, priority, scheduled_time,
                phone, follow_up_required, follow_up_date, data, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(call.id().as_uuid())
        .bind(call.business_id().as_uuid())
        .bind(call.campaign_id().map(|c| c.as_uuid()))
        .bind(call.status().as_str())
        .bind(call.priority().value() as i16)
        .bind(call.scheduled_time())
        .bind(call.recipient().phone().as_str())
        .bind(call.follow_up_required())
        .bind(call.follow_up_date())
        .bind(Self::encode(call)?)
        .bind(call.created_at())
        .bind(call.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &CallId) -> Result<Option<OutboundCall>> {
        let row = sqlx::query("SELECT data FROM outbound_calls WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;

        row.map(|r| Self::decode(r.get("data"))).transpose()
    }

    async fn update(&self, call: &OutboundCall) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE outbound_calls
            SET campaign_id = $2, status = $3, priority = $4, scheduled_time = $5,
                follow_up_required = $6, follow_up_date = $7, data = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(call.id().as_uuid())
        .bind(call.campaign_id().map(|c| c.as_uuid()))
        .bind(call.status().as_str())
        .bind(call.priority().value() as i16)
        .bind(call.scheduled_time())
        .bind(call.follow_up_required())
        .bind(call.follow_up_date())
        .bind(Self::encode(call)?)
        .bind(call.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(call.id().to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &CallId) -> Result<()> {
        sqlx::query("DELETE FROM outbound_calls WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn businesses_with_due_calls(&self, now: DateTime<Utc>) -> Result<Vec<BusinessId>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT business_id FROM outbound_calls
            WHERE status = ANY($1) AND scheduled_time <= $2
            "#,
        )
        .bind(CLAIMABLE_STATUSES)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(rows
            .into_iter()
            .map(|r| BusinessId::from_uuid(r.get::<Uuid, _>("business_id")))
            .collect())
    }

    async fn get_due_calls(
        &self,
        business_id: &BusinessId,
        priority_threshold: u8,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundCall>> {
        self.fetch_documents(
            sqlx::query(
                r#"
                SELECT data FROM outbound_calls
                WHERE business_id = $1 AND status = ANY($2)
                  AND scheduled_time <= $3 AND priority >= $4
                ORDER BY priority DESC, scheduled_time ASC
                "#,
            )
            .bind(business_id.as_uuid())
            .bind(CLAIMABLE_STATUSES)
            .bind(now)
            .bind(priority_threshold as i16),
        )
        .await
    }

    async fn get_retry_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>> {
        self.fetch_documents(
            sqlx::query(
                r#"
                SELECT data FROM outbound_calls
                WHERE business_id = $1 AND status = ANY($2)
                  AND (data->>'current_attempt')::int > 0
                ORDER BY scheduled_time ASC
                "#,
            )
            .bind(business_id.as_uuid())
            .bind(CLAIMABLE_STATUSES),
        )
        .await
    }

    async fn get_active_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>> {
        self.fetch_documents(
            sqlx::query(
                "SELECT data FROM outbound_calls WHERE business_id = $1 AND status = ANY($2)",
            )
            .bind(business_id.as_uuid())
            .bind(ACTIVE_STATUSES),
        )
        .await
    }

    async fn get_next_call_in_queue(
        &self,
        business_id: &BusinessId,
        campaign_id: Option<&CampaignId>,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboundCall>> {
        let row = sqlx::query(
            r#"
            SELECT data FROM outbound_calls
            WHERE business_id = $1 AND status = ANY($2) AND scheduled_time <= $3
              AND ($4::uuid IS NULL OR campaign_id = $4)
            ORDER BY priority DESC, scheduled_time ASC
            LIMIT 1
            "#,
        )
        .bind(business_id.as_uuid())
        .bind(CLAIMABLE_STATUSES)
        .bind(now)
        .bind(campaign_id.map(|c| c.as_uuid()))
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.map(|r| Self::decode(r.get("data"))).transpose()
    }

    async fn claim_for_dial(
        &self,
        id: &CallId,
        session_id: SessionId,
        concurrency_limit: u32,
    ) -> Result<Option<OutboundCall>> {
        let mut tx = self.pool.begin().await.map_err(Self::db_err)?;

        let Some(business_row) =
            sqlx::query("SELECT business_id FROM outbound_calls WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(Self::db_err)?
        else {
            return Ok(None);
        };
        let business_id: Uuid = business_row.get("business_id");

        // Serialize claims per business through the slot row lock
        sqlx::query("INSERT INTO business_dial_slots (business_id) VALUES ($1) ON CONFLICT DO NOTHING")
            .bind(business_id)
            .execute(&mut *tx)
            .await
            .map_err(Self::db_err)?;
        sqlx::query("SELECT business_id FROM business_dial_slots WHERE business_id = $1 FOR UPDATE")
            .bind(business_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(Self::db_err)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM outbound_calls WHERE business_id = $1 AND status = ANY($2)",
        )
        .bind(business_id)
        .bind(ACTIVE_STATUSES)
        .fetch_one(&mut *tx)
        .await
        .map_err(Self::db_err)?;

        if active >= concurrency_limit as i64 {
            debug!(call_id = %id, active, concurrency_limit, "claim rejected: business at limit");
            return Ok(None);
        }

        let Some(row) = sqlx::query(
            "SELECT data FROM outbound_calls WHERE id = $1 AND status = ANY($2) FOR UPDATE",
        )
        .bind(id.as_uuid())
        .bind(CLAIMABLE_STATUSES)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Self::db_err)?
        else {
            // Lost the race: another worker claimed it, or it was cancelled
            return Ok(None);
        };

        let mut call = Self::decode(row.get("data"))?;
        if call.start(session_id).is_err() {
            return Ok(None);
        }

        sqlx::query(
            "UPDATE outbound_calls SET status = $2, data = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(call.status().as_str())
        .bind(Self::encode(&call)?)
        .bind(call.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(Self::db_err)?;

        tx.commit().await.map_err(Self::db_err)?;
        Ok(Some(call))
    }

    async fn get_campaign_calls(&self, campaign_id: &CampaignId) -> Result<Vec<OutboundCall>> {
        self.fetch_documents(
            sqlx::query("SELECT data FROM outbound_calls WHERE campaign_id = $1")
                .bind(campaign_id.as_uuid()),
        )
        .await
    }

    async fn pause_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE outbound_calls
            SET status = 'paused',
                data = jsonb_set(data, '{status}', '"paused"'),
                updated_at = $2
            WHERE campaign_id = $1 AND status = ANY($3)
            "#,
        )
        .bind(campaign_id.as_uuid())
        .bind(Utc::now())
        .bind(CLAIMABLE_STATUSES)
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }

    async fn resume_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE outbound_calls
            SET status = 'scheduled',
                data = jsonb_set(data, '{status}', '"scheduled"'),
                updated_at = $2
            WHERE campaign_id = $1 AND status = 'paused'
            "#,
        )
        .bind(campaign_id.as_uuid())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        Ok(result.rows_affected())
    }

    async fn get_due_follow_ups(&self, now: DateTime<Utc>) -> Result<Vec<OutboundCall>> {
        self.fetch_documents(
            sqlx::query(
                r#"
                SELECT data FROM outbound_calls
                WHERE follow_up_required AND follow_up_date <= $1
                  AND status = ANY($2)
                "#,
            )
            .bind(now)
            .bind(TERMINAL_STATUSES),
        )
        .await
    }
}
