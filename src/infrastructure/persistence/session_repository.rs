//! PostgreSQL implementation of the session repository

use crate::domain::session::aggregate::VoiceSession;
use crate::domain::session::repository::SessionRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, error};

const TERMINAL_STATUSES: &[&str] = &["ended", "failed"];

pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode(data: serde_json::Value) -> Result<VoiceSession> {
        serde_json::from_value(data)
            .map_err(|e| DomainError::Internal(format!("corrupt session document: {}", e)))
    }

    fn encode(session: &VoiceSession) -> Result<serde_json::Value> {
        serde_json::to_value(session)
            .map_err(|e| DomainError::Internal(format!("serialize session: {}", e)))
    }

    fn db_err(e: sqlx::Error) -> DomainError {
        error!("database error: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: &VoiceSession) -> Result<()> {
        debug!(session_id = %session.id(), "inserting session");
        sqlx::query(
            r#"
            INSERT INTO voice_sessions (
                id, business_id, call_id, status, started_at, timeout_minutes,
                data, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.business_id().as_uuid())
        .bind(session.call_id().map(|c| c.as_uuid()))
        .bind(session.status().as_str())
        .bind(session.started_at())
        .bind(session.timeout_minutes() as i32)
        .bind(Self::encode(session)?)
        .bind(session.created_at())
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<VoiceSession>> {
        let row = sqlx::query("SELECT data FROM voice_sessions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::db_err)?;

        row.map(|r| Self::decode(r.get("data"))).transpose()
    }

    async fn find_by_call(&self, call_id: &CallId) -> Result<Option<VoiceSession>> {
        let row = sqlx::query(
            "SELECT data FROM voice_sessions WHERE call_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(call_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(Self::db_err)?;

        row.map(|r| Self::decode(r.get("data"))).transpose()
    }

    async fn update(&self, session: &VoiceSession) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE voice_sessions
            SET status = $2, started_at = $3, timeout_minutes = $4, data = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.status().as_str())
        .bind(session.started_at())
        .bind(session.timeout_minutes() as i32)
        .bind(Self::encode(session)?)
        .bind(session.updated_at())
        .execute(&self.pool)
        .await
        .map_err(Self::db_err)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(session.id().to_string()));
        }
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        sqlx::query("DELETE FROM voice_sessions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(Self::db_err)?;
        Ok(())
    }

    async fn get_active_sessions(&self, business_id: &BusinessId) -> Result<Vec<VoiceSession>> {
        let rows = sqlx::query(
            "SELECT data FROM voice_sessions WHERE business_id = $1 AND NOT (status = ANY($2))",
        )
        .bind(business_id.as_uuid())
        .bind(TERMINAL_STATUSES)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        rows.into_iter()
            .map(|r| Self::decode(r.get("data")))
            .collect()
    }

    async fn get_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<VoiceSession>> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM voice_sessions
            WHERE NOT (status = ANY($1))
              AND started_at IS NOT NULL
              AND started_at + make_interval(mins => timeout_minutes) < $2
            "#,
        )
        .bind(TERMINAL_STATUSES)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(Self::db_err)?;

        rows.into_iter()
            .map(|r| Self::decode(r.get("data")))
            .collect()
    }

    async fn end_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        // Expiry goes through the domain transition so duration bookkeeping
        // and the end reason stay consistent with a normal end.
        let expired = self.get_expired_sessions(now).await?;
        let mut ended = 0u64;
        for mut session in expired {
            if session.end(Some("session timeout")).is_ok() {
                self.update(&session).await?;
                ended += 1;
            }
        }
        Ok(ended)
    }
}
