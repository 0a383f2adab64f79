//! Voice session entity

use crate::domain::session::value_object::{
    SessionAnalytics, SessionContext, SessionKind, SessionStatus, TranscriptEntry,
};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, SessionId, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMEOUT_MINUTES: u32 = 60;
pub const EMERGENCY_TIMEOUT_MINUTES: u32 = 120;

/// Voice session entity
///
/// One live-conversation lifecycle. Optionally correlated 1:1 with an
/// outbound call attempt through `call_id`; the correlation is a lookup
/// relation, never ownership, since a session can outlive the attempt
/// that spawned it and a call can be retried across multiple sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSession {
    id: SessionId,
    business_id: BusinessId,
    user_id: Option<UserId>,
    kind: SessionKind,
    status: SessionStatus,
    room_name: String,
    room_token: Option<String>,
    timeout_minutes: u32,
    call_id: Option<CallId>,
    context: SessionContext,
    analytics: SessionAnalytics,
    transcript: Vec<TranscriptEntry>,
    processed_commands: Vec<String>,
    emergency_mode: bool,
    background: bool,
    error_log: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    last_activity: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VoiceSession {
    pub fn new(
        business_id: BusinessId,
        kind: SessionKind,
        room_name: impl Into<String>,
    ) -> Result<Self> {
        let room_name = room_name.into();
        if room_name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Session room name is required".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: SessionId::new(),
            business_id,
            user_id: None,
            kind,
            status: SessionStatus::Initializing,
            room_name,
            room_token: None,
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            call_id: None,
            context: SessionContext::new(),
            analytics: SessionAnalytics::new(),
            transcript: Vec::new(),
            processed_commands: Vec::new(),
            emergency_mode: false,
            background: false,
            error_log: Vec::new(),
            started_at: None,
            ended_at: None,
            last_activity: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// Use a pre-allocated session id (the scheduler assigns the id at
    /// claim time, before the room exists)
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_call(mut self, call_id: CallId) -> Self {
        self.call_id = Some(call_id);
        self
    }

    pub fn with_room_token(mut self, token: impl Into<String>) -> Self {
        self.room_token = Some(token.into());
        self
    }

    pub fn with_timeout_minutes(mut self, minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(DomainError::ValidationError(
                "Session timeout must be greater than zero".to_string(),
            ));
        }
        self.timeout_minutes = minutes;
        Ok(self)
    }

    pub fn with_background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    /// Begin the conversation
    pub fn start(&mut self) -> Result<()> {
        self.transition_to(SessionStatus::Active)?;
        let now = Utc::now();
        self.started_at = Some(now);
        self.last_activity = now;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        self.transition_to(SessionStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.status != SessionStatus::Paused {
            return Err(DomainError::InvalidStateTransition(
                "Can only resume a paused session".to_string(),
            ));
        }
        self.transition_to(SessionStatus::Active)?;
        self.last_activity = Utc::now();
        Ok(())
    }

    /// End the conversation
    ///
    /// Valid from any non-terminal state; computes the total duration
    /// from `started_at`.
    pub fn end(&mut self, reason: Option<&str>) -> Result<()> {
        self.transition_to(SessionStatus::Ended)?;
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);

        if let Some(started) = self.started_at {
            self.analytics
                .set_total_duration_seconds((ended_at - started).num_seconds());
        }
        if let Some(reason) = reason {
            self.context
                .set_metadata("end_reason", reason.to_string())
                .ok();
        }
        Ok(())
    }

    /// Fail the session, appending a timestamped line to the error log
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        self.transition_to(SessionStatus::Failed)?;
        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);
        self.error_log
            .push(format!("{}: {}", ended_at.to_rfc3339(), error_message.into()));

        if let Some(started) = self.started_at {
            self.analytics
                .set_total_duration_seconds((ended_at - started).num_seconds());
        }
        Ok(())
    }

    /// Expired: terminal, or past the timeout measured from start
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return true;
        }
        match self.started_at {
            Some(started) => now > started + Duration::minutes(self.timeout_minutes as i64),
            None => false,
        }
    }

    /// Idle: active and quiet past the threshold; never true for paused
    /// or terminal sessions
    pub fn is_idle(&self, idle_minutes: u32, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active
            && now > self.last_activity + Duration::minutes(idle_minutes as i64)
    }

    /// Extend the timeout for an emergency conversation
    pub fn enable_emergency_mode(&mut self) {
        self.emergency_mode = true;
        self.timeout_minutes = EMERGENCY_TIMEOUT_MINUTES;
        self.touch();
    }

    pub fn disable_emergency_mode(&mut self) {
        self.emergency_mode = false;
        self.timeout_minutes = DEFAULT_TIMEOUT_MINUTES;
        self.touch();
    }

    /// Record one processed command
    ///
    /// Commands are idempotent by id: a repeated id is ignored so
    /// redelivered pipeline callbacks do not skew the accumulator.
    pub fn record_command(
        &mut self,
        command_id: impl Into<String>,
        success: bool,
        response_ms: u64,
    ) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidOperation(
                "Cannot record commands on an ended session".to_string(),
            ));
        }

        let command_id = command_id.into();
        if self.processed_commands.contains(&command_id) {
            return Ok(());
        }
        self.processed_commands.push(command_id);
        self.analytics.record_command(success, response_ms);
        self.last_activity = Utc::now();
        self.touch();
        Ok(())
    }

    pub fn append_transcript(&mut self, speaker: impl Into<String>, text: impl Into<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidOperation(
                "Cannot append transcript to an ended session".to_string(),
            ));
        }
        self.transcript.push(TranscriptEntry {
            speaker: speaker.into(),
            text: text.into(),
            at: Utc::now(),
        });
        self.last_activity = Utc::now();
        self.touch();
        Ok(())
    }

    /// Backfill analytics after the session ended
    pub fn backfill_analytics<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut SessionAnalytics),
    {
        f(&mut self.analytics);
        self.touch();
        Ok(())
    }

    pub fn context_mut(&mut self) -> Result<&mut SessionContext> {
        if self.status.is_terminal() {
            return Err(DomainError::InvalidOperation(
                "Cannot mutate context on an ended session".to_string(),
            ));
        }
        Ok(&mut self.context)
    }

    fn transition_to(&mut self, new_status: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot transition from {:?} to {:?}",
                self.status, new_status
            )));
        }
        self.status = new_status;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn business_id(&self) -> &BusinessId {
        &self.business_id
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    pub fn room_token(&self) -> Option<&str> {
        self.room_token.as_deref()
    }

    pub fn timeout_minutes(&self) -> u32 {
        self.timeout_minutes
    }

    pub fn call_id(&self) -> Option<&CallId> {
        self.call_id.as_ref()
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn analytics(&self) -> &SessionAnalytics {
        &self.analytics
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn processed_commands(&self) -> &[String] {
        &self.processed_commands
    }

    pub fn emergency_mode(&self) -> bool {
        self.emergency_mode
    }

    pub fn background(&self) -> bool {
        self.background
    }

    pub fn error_log(&self) -> &[String] {
        &self.error_log
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> VoiceSession {
        VoiceSession::new(BusinessId::new(), SessionKind::OutboundCall, "room-1").unwrap()
    }

    #[test]
    fn test_requires_room_name() {
        assert!(VoiceSession::new(BusinessId::new(), SessionKind::OutboundCall, "").is_err());
        assert!(VoiceSession::new(BusinessId::new(), SessionKind::OutboundCall, "  ").is_err());
    }

    #[test]
    fn test_timeout_must_be_positive() {
        assert!(test_session().with_timeout_minutes(0).is_err());
        assert_eq!(
            test_session().with_timeout_minutes(30).unwrap().timeout_minutes(),
            30
        );
    }

    #[test]
    fn test_lifecycle() {
        let mut session = test_session();
        assert_eq!(session.status(), SessionStatus::Initializing);

        session.start().unwrap();
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(session.started_at().is_some());

        session.pause().unwrap();
        assert_eq!(session.status(), SessionStatus::Paused);

        session.resume().unwrap();
        assert_eq!(session.status(), SessionStatus::Active);

        session.end(Some("conversation finished")).unwrap();
        assert_eq!(session.status(), SessionStatus::Ended);
        assert!(session.ended_at().is_some());
        assert!(session.analytics().total_duration_seconds().is_some());
        assert_eq!(
            session.context().metadata("end_reason"),
            Some("conversation finished")
        );
    }

    #[test]
    fn test_end_twice_fails() {
        let mut session = test_session();
        session.start().unwrap();
        session.end(None).unwrap();
        assert!(session.end(None).is_err());
    }

    #[test]
    fn test_fail_appends_error_log() {
        let mut session = test_session();
        session.fail("transport dropped the room").unwrap();

        assert_eq!(session.status(), SessionStatus::Failed);
        assert_eq!(session.error_log().len(), 1);
        assert!(session.error_log()[0].contains("transport dropped the room"));
    }

    #[test]
    fn test_expiry() {
        let mut session = test_session().with_timeout_minutes(30).unwrap();
        let now = Utc::now();

        // Not started, not terminal: never expired
        assert!(!session.is_expired(now));

        session.start().unwrap();
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::minutes(31)));

        // Terminal sessions are always expired
        session.end(None).unwrap();
        assert!(session.is_expired(now));
    }

    #[test]
    fn test_idle_only_while_active() {
        let mut session = test_session();
        session.start().unwrap();

        let later = Utc::now() + Duration::minutes(20);
        assert!(session.is_idle(10, later));
        assert!(!session.is_idle(30, later));

        session.pause().unwrap();
        assert!(!session.is_idle(10, later));

        let mut ended = test_session();
        ended.start().unwrap();
        ended.end(None).unwrap();
        assert!(!ended.is_idle(10, later));
    }

    #[test]
    fn test_emergency_mode_extends_timeout() {
        let mut session = test_session();
        assert_eq!(session.timeout_minutes(), DEFAULT_TIMEOUT_MINUTES);

        session.enable_emergency_mode();
        assert!(session.emergency_mode());
        assert_eq!(session.timeout_minutes(), EMERGENCY_TIMEOUT_MINUTES);

        session.disable_emergency_mode();
        assert!(!session.emergency_mode());
        assert_eq!(session.timeout_minutes(), DEFAULT_TIMEOUT_MINUTES);
    }

    #[test]
    fn test_record_command_updates_activity() {
        let mut session = test_session();
        session.start().unwrap();
        let before = session.last_activity();

        std::thread::sleep(std::time::Duration::from_millis(5));
        session.record_command("cmd-1", true, 120).unwrap();

        assert_eq!(session.analytics().total_commands(), 1);
        assert!(session.last_activity() > before);
    }

    #[test]
    fn test_record_command_deduplicates() {
        let mut session = test_session();
        session.start().unwrap();

        session.record_command("cmd-1", true, 100).unwrap();
        session.record_command("cmd-1", false, 900).unwrap();

        assert_eq!(session.analytics().total_commands(), 1);
        assert_eq!(session.analytics().successful_commands(), 1);
    }

    #[test]
    fn test_no_mutation_after_terminal() {
        let mut session = test_session();
        session.start().unwrap();
        session.end(None).unwrap();

        assert!(session.record_command("cmd-2", true, 50).is_err());
        assert!(session.append_transcript("agent", "hello?").is_err());
        assert!(session.context_mut().is_err());

        // Analytics backfill is still allowed
        session
            .backfill_analytics(|a| a.set_total_duration_seconds(42))
            .unwrap();
        assert_eq!(session.analytics().total_duration_seconds(), Some(42));
    }

    #[test]
    fn test_transcript_accumulates() {
        let mut session = test_session();
        session.start().unwrap();
        session.append_transcript("agent", "Hi, am I speaking with Pat?").unwrap();
        session.append_transcript("customer", "Speaking.").unwrap();

        assert_eq!(session.transcript().len(), 2);
        assert_eq!(session.transcript()[0].speaker, "agent");
    }
}
