//! Outbound call domain events

use crate::domain::call::value_object::CallOutcome;
use crate::domain::shared::events::{DomainEvent, EventMetadata};
use crate::domain::shared::value_objects::{CallId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Base struct for all call events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEventBase {
    pub metadata: EventMetadata,
    pub call_id: CallId,
}

/// Call scheduled event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallScheduled {
    pub base: CallEventBase,
    pub scheduled_time: DateTime<Utc>,
}

impl DomainEvent for CallScheduled {
    fn event_type(&self) -> &'static str {
        "call.scheduled"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Dial attempt started event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialStarted {
    pub base: CallEventBase,
    pub session_id: SessionId,
    pub attempt: u32,
}

impl DomainEvent for DialStarted {
    fn event_type(&self) -> &'static str {
        "call.dial_started"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call completed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallCompleted {
    pub base: CallEventBase,
    pub outcome: CallOutcome,
    pub ended_at: DateTime<Utc>,
    pub talk_time_seconds: Option<i64>,
}

impl DomainEvent for CallCompleted {
    fn event_type(&self) -> &'static str {
        "call.completed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call attempt failed event (failed / no-answer / busy / voicemail)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallAttemptFailed {
    pub base: CallEventBase,
    pub reason: String,
    pub attempt: u32,
}

impl DomainEvent for CallAttemptFailed {
    fn event_type(&self) -> &'static str {
        "call.attempt_failed"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call rescheduled for retry event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRescheduled {
    pub base: CallEventBase,
    pub next_attempt_at: DateTime<Utc>,
    pub attempts_used: u32,
}

impl DomainEvent for CallRescheduled {
    fn event_type(&self) -> &'static str {
        "call.rescheduled"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Call cancelled event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallCancelled {
    pub base: CallEventBase,
    pub reason: String,
}

impl DomainEvent for CallCancelled {
    fn event_type(&self) -> &'static str {
        "call.cancelled"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Follow-up flagged event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpFlagged {
    pub base: CallEventBase,
    pub due_at: DateTime<Utc>,
    pub outcome: CallOutcome,
}

impl DomainEvent for FollowUpFlagged {
    fn event_type(&self) -> &'static str {
        "call.follow_up_flagged"
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.base.metadata.occurred_at
    }
}

/// Union of all call events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CallEvent {
    Scheduled(CallScheduled),
    DialStarted(DialStarted),
    Completed(CallCompleted),
    AttemptFailed(CallAttemptFailed),
    Rescheduled(CallRescheduled),
    Cancelled(CallCancelled),
    FollowUpFlagged(FollowUpFlagged),
}

impl CallEvent {
    pub fn call_id(&self) -> &CallId {
        match self {
            CallEvent::Scheduled(e) => &e.base.call_id,
            CallEvent::DialStarted(e) => &e.base.call_id,
            CallEvent::Completed(e) => &e.base.call_id,
            CallEvent::AttemptFailed(e) => &e.base.call_id,
            CallEvent::Rescheduled(e) => &e.base.call_id,
            CallEvent::Cancelled(e) => &e.base.call_id,
            CallEvent::FollowUpFlagged(e) => &e.base.call_id,
        }
    }
}
