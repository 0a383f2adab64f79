//! Voice session value objects

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ContactId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Voice session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Room requested, conversation not yet running
    Initializing,
    /// Conversation running
    Active,
    /// Conversation suspended
    Paused,
    /// Conversation ended normally
    Ended,
    /// Session died on an error
    Failed,
}

impl SessionStatus {
    pub fn can_transition_to(&self, new_status: SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, new_status) {
            (Initializing, Active) => true,
            (Active, Paused) => true,
            (Paused, Active) => true,
            // End from any non-terminal state
            (Initializing, Ended) | (Active, Ended) | (Paused, Ended) => true,
            // Failure from any non-terminal state
            (Initializing, Failed) | (Active, Failed) | (Paused, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Initializing => "initializing",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Ended => "ended",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initializing" => Some(SessionStatus::Initializing),
            "active" => Some(SessionStatus::Active),
            "paused" => Some(SessionStatus::Paused),
            "ended" => Some(SessionStatus::Ended),
            "failed" => Some(SessionStatus::Failed),
            _ => None,
        }
    }
}

/// What kind of agent owns the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Servicing an outbound call attempt
    OutboundCall,
    /// Personal assistant conversation, not bound to a call
    PersonalAssistant,
    /// Field technician hands-free session
    FieldAssistant,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::OutboundCall => "outbound_call",
            SessionKind::PersonalAssistant => "personal_assistant",
            SessionKind::FieldAssistant => "field_assistant",
        }
    }
}

/// One line of conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

/// Session context: references to what the conversation is about plus a
/// bounded metadata/conversation-state store
///
/// The maps are only reachable through the accessor methods so the entry
/// and size bounds hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    current_location: Option<String>,
    current_job_id: Option<String>,
    current_contact_id: Option<ContactId>,
    current_project_id: Option<String>,
    assigned_user_id: Option<UserId>,
    metadata: BTreeMap<String, String>,
    conversation_state: BTreeMap<String, String>,
}

impl SessionContext {
    pub const MAX_ENTRIES: usize = 64;
    pub const MAX_VALUE_LEN: usize = 4096;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_current_location(&mut self, location: Option<String>) {
        self.current_location = location;
    }

    pub fn set_current_job_id(&mut self, job_id: Option<String>) {
        self.current_job_id = job_id;
    }

    pub fn set_current_contact_id(&mut self, contact_id: Option<ContactId>) {
        self.current_contact_id = contact_id;
    }

    pub fn set_current_project_id(&mut self, project_id: Option<String>) {
        self.current_project_id = project_id;
    }

    pub fn set_assigned_user_id(&mut self, user_id: Option<UserId>) {
        self.assigned_user_id = user_id;
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        Self::bounded_insert(&mut self.metadata, key.into(), value.into())
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub fn set_conversation_state(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        Self::bounded_insert(&mut self.conversation_state, key.into(), value.into())
    }

    pub fn conversation_state(&self, key: &str) -> Option<&str> {
        self.conversation_state.get(key).map(String::as_str)
    }

    pub fn clear_conversation_state(&mut self) {
        self.conversation_state.clear();
    }

    pub fn current_location(&self) -> Option<&str> {
        self.current_location.as_deref()
    }

    pub fn current_job_id(&self) -> Option<&str> {
        self.current_job_id.as_deref()
    }

    pub fn current_contact_id(&self) -> Option<&ContactId> {
        self.current_contact_id.as_ref()
    }

    pub fn current_project_id(&self) -> Option<&str> {
        self.current_project_id.as_deref()
    }

    pub fn assigned_user_id(&self) -> Option<&UserId> {
        self.assigned_user_id.as_ref()
    }

    fn bounded_insert(
        map: &mut BTreeMap<String, String>,
        key: String,
        value: String,
    ) -> Result<()> {
        if value.len() > Self::MAX_VALUE_LEN {
            return Err(DomainError::ValidationError(format!(
                "Context value for '{}' exceeds {} bytes",
                key,
                Self::MAX_VALUE_LEN
            )));
        }
        if !map.contains_key(&key) && map.len() >= Self::MAX_ENTRIES {
            return Err(DomainError::ValidationError(format!(
                "Context map is full ({} entries)",
                Self::MAX_ENTRIES
            )));
        }
        map.insert(key, value);
        Ok(())
    }
}

/// Running command analytics for a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalytics {
    total_commands: u64,
    successful_commands: u64,
    average_response_ms: f64,
    total_duration_seconds: Option<i64>,
}

impl SessionAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one processed command into the running accumulator
    pub fn record_command(&mut self, success: bool, response_ms: u64) {
        let previous_total = self.total_commands as f64;
        self.total_commands += 1;
        if success {
            self.successful_commands += 1;
        }
        self.average_response_ms =
            (self.average_response_ms * previous_total + response_ms as f64) / self.total_commands as f64;
    }

    pub fn set_total_duration_seconds(&mut self, seconds: i64) {
        self.total_duration_seconds = Some(seconds.max(0));
    }

    pub fn total_commands(&self) -> u64 {
        self.total_commands
    }

    pub fn successful_commands(&self) -> u64 {
        self.successful_commands
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_commands == 0 {
            return 0.0;
        }
        self.successful_commands as f64 / self.total_commands as f64
    }

    pub fn average_response_ms(&self) -> f64 {
        self.average_response_ms
    }

    pub fn total_duration_seconds(&self) -> Option<i64> {
        self.total_duration_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_transitions() {
        assert!(SessionStatus::Initializing.can_transition_to(SessionStatus::Active));
        assert!(SessionStatus::Active.can_transition_to(SessionStatus::Paused));
        assert!(SessionStatus::Paused.can_transition_to(SessionStatus::Active));
        assert!(SessionStatus::Initializing.can_transition_to(SessionStatus::Ended));
        assert!(SessionStatus::Paused.can_transition_to(SessionStatus::Failed));

        assert!(!SessionStatus::Initializing.can_transition_to(SessionStatus::Paused));
        assert!(!SessionStatus::Ended.can_transition_to(SessionStatus::Active));
        assert!(!SessionStatus::Failed.can_transition_to(SessionStatus::Ended));
    }

    #[test]
    fn test_context_bounds() {
        let mut context = SessionContext::new();
        context.set_metadata("channel", "phone").unwrap();
        assert_eq!(context.metadata("channel"), Some("phone"));

        let oversized = "x".repeat(SessionContext::MAX_VALUE_LEN + 1);
        assert!(context.set_metadata("big", oversized).is_err());

        for i in 0..SessionContext::MAX_ENTRIES {
            let _ = context.set_conversation_state(format!("k{}", i), "v");
        }
        assert!(context.set_conversation_state("overflow", "v").is_err());
        // Updating an existing key still works at capacity
        assert!(context.set_conversation_state("k0", "updated").is_ok());
    }

    #[test]
    fn test_analytics_accumulator() {
        let mut analytics = SessionAnalytics::new();
        analytics.record_command(true, 100);
        analytics.record_command(false, 300);

        assert_eq!(analytics.total_commands(), 2);
        assert_eq!(analytics.successful_commands(), 1);
        assert!((analytics.success_rate() - 0.5).abs() < f64::EPSILON);
        assert!((analytics.average_response_ms() - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_analytics_empty_success_rate() {
        assert_eq!(SessionAnalytics::new().success_rate(), 0.0);
    }
}
