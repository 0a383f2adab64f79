//! Voice session repository interface

use crate::domain::session::aggregate::VoiceSession;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for voice sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &VoiceSession) -> Result<()>;

    /// Find a session by its ID
    async fn find_by_id(&self, id: &SessionId) -> Result<Option<VoiceSession>>;

    /// Find the session currently servicing a call attempt
    async fn find_by_call(&self, call_id: &CallId) -> Result<Option<VoiceSession>>;

    /// Save an existing session
    async fn update(&self, session: &VoiceSession) -> Result<()>;

    /// Delete a session
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Sessions in a non-terminal state for a business
    async fn get_active_sessions(&self, business_id: &BusinessId) -> Result<Vec<VoiceSession>>;

    /// Non-terminal sessions past their timeout
    async fn get_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<VoiceSession>>;

    /// Force-end every expired session; returns how many were ended
    async fn end_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64>;
}
