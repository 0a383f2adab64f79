//! Outbound call aggregate root

use crate::domain::call::event::{
    CallAttemptFailed, CallCancelled, CallCompleted, CallEvent, CallEventBase, CallRescheduled,
    CallScheduled, DialStarted, FollowUpFlagged,
};
use crate::domain::call::policy::{follow_up_delay, RetryPolicy};
use crate::domain::call::value_object::{
    CallAnalytics, CallOutcome, CallPriority, CallPurpose, CallRecipient, CallScript, CallStatus,
};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::events::EventMetadata;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, CampaignId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outbound call aggregate root
///
/// One call attempt lifecycle: scheduling, dialing, outcome, retry and
/// follow-up decisions. State changes go through the transition methods;
/// terminal states are immutable except for analytics backfill and
/// follow-up consumption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundCall {
    id: CallId,
    business_id: BusinessId,
    campaign_id: Option<CampaignId>,
    purpose: CallPurpose,
    priority: CallPriority,
    status: CallStatus,
    recipient: CallRecipient,
    script: CallScript,
    scheduled_time: DateTime<Utc>,
    actual_start_time: Option<DateTime<Utc>>,
    connected_time: Option<DateTime<Utc>>,
    actual_end_time: Option<DateTime<Utc>>,
    current_attempt: u32,
    max_attempts: u32,
    retry_interval_minutes: u32,
    session_id: Option<SessionId>,
    room_name: Option<String>,
    outcome: Option<CallOutcome>,
    outcome_notes: Option<String>,
    follow_up_required: bool,
    follow_up_date: Option<DateTime<Utc>>,
    analytics: CallAnalytics,
    transcript_ref: Option<String>,
    recording_ref: Option<String>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Pending domain events
    #[serde(skip)]
    events: Vec<CallEvent>,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_INTERVAL_MINUTES: u32 = 30;

impl OutboundCall {
    /// Schedule a new outbound call
    ///
    /// Recipient and script arrive already validated; the factory checks
    /// the retry bounds and records the scheduling event.
    pub fn schedule(
        business_id: BusinessId,
        recipient: CallRecipient,
        script: CallScript,
        purpose: CallPurpose,
        priority: CallPriority,
        scheduled_time: DateTime<Utc>,
    ) -> Result<Self> {
        let now = Utc::now();
        let id = CallId::new();

        let mut call = Self {
            id,
            business_id,
            campaign_id: None,
            purpose,
            priority,
            status: CallStatus::Scheduled,
            recipient,
            script,
            scheduled_time,
            actual_start_time: None,
            connected_time: None,
            actual_end_time: None,
            current_attempt: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_interval_minutes: DEFAULT_RETRY_INTERVAL_MINUTES,
            session_id: None,
            room_name: None,
            outcome: None,
            outcome_notes: None,
            follow_up_required: false,
            follow_up_date: None,
            analytics: CallAnalytics::new(),
            transcript_ref: None,
            recording_ref: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };

        call.record_event(CallEvent::Scheduled(CallScheduled {
            base: CallEventBase {
                metadata: EventMetadata::new("call.scheduled".to_string()),
                call_id: id,
            },
            scheduled_time,
        }));

        Ok(call)
    }

    pub fn with_campaign(mut self, campaign_id: CampaignId) -> Self {
        self.campaign_id = Some(campaign_id);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self> {
        if max_attempts == 0 {
            return Err(DomainError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    pub fn with_retry_interval_minutes(mut self, minutes: u32) -> Self {
        self.retry_interval_minutes = minutes;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Hand the call to the dial queue
    pub fn enqueue(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Queued)
    }

    /// Start a dial attempt
    ///
    /// Only valid from Scheduled/Queued and only while attempts remain.
    /// Increments the attempt counter, records the dial in analytics and
    /// moves the call to Dialing.
    pub fn start(&mut self, session_id: SessionId) -> Result<()> {
        if !self.status.is_claimable() {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot start dialing from {:?}",
                self.status
            )));
        }
        if self.current_attempt >= self.max_attempts {
            return Err(DomainError::InvalidOperation(format!(
                "Attempt limit reached ({}/{})",
                self.current_attempt, self.max_attempts
            )));
        }

        self.transition_to(CallStatus::Dialing)?;
        self.current_attempt += 1;
        self.analytics.record_dial_attempt();
        self.actual_start_time = Some(Utc::now());
        self.session_id = Some(session_id);
        self.connected_time = None;
        self.actual_end_time = None;

        self.record_event(CallEvent::DialStarted(DialStarted {
            base: CallEventBase {
                metadata: EventMetadata::new("call.dial_started".to_string()),
                call_id: self.id,
            },
            session_id,
            attempt: self.current_attempt,
        }));

        Ok(())
    }

    /// Record the transport room servicing this attempt
    pub fn set_room(&mut self, room_name: impl Into<String>) -> Result<()> {
        if !self.status.is_active() {
            return Err(DomainError::InvalidOperation(
                "Room can only be set on an active call".to_string(),
            ));
        }
        self.room_name = Some(room_name.into());
        self.touch();
        Ok(())
    }

    pub fn mark_ringing(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Ringing)
    }

    pub fn mark_connected(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Connected)?;
        self.connected_time = Some(Utc::now());
        Ok(())
    }

    pub fn mark_in_progress(&mut self) -> Result<()> {
        self.transition_to(CallStatus::InProgress)
    }

    /// Complete the call with a conversation outcome
    ///
    /// Derives connection and talk durations from the elapsed wall-clock
    /// interval, then evaluates the follow-up policy.
    pub fn complete(&mut self, outcome: CallOutcome, notes: Option<String>) -> Result<()> {
        self.transition_to(CallStatus::Completed)?;

        let ended_at = Utc::now();
        self.actual_end_time = Some(ended_at);
        self.outcome = Some(outcome);
        self.outcome_notes = notes;

        if let Some(started) = self.actual_start_time {
            let connection = (ended_at - started).num_seconds();
            let talk = self
                .connected_time
                .map(|connected| (ended_at - connected).num_seconds())
                .unwrap_or(connection);
            self.analytics.set_durations(connection, talk);
        }

        self.record_event(CallEvent::Completed(CallCompleted {
            base: CallEventBase {
                metadata: EventMetadata::new("call.completed".to_string()),
                call_id: self.id,
            },
            outcome,
            ended_at,
            talk_time_seconds: self.analytics.talk_time_seconds(),
        }));

        self.apply_follow_up_policy(outcome, ended_at);
        Ok(())
    }

    /// Fail the current attempt
    ///
    /// Transport and conversation failures both land here; with attempts
    /// remaining the retry policy reschedules the call.
    pub fn fail(&mut self, reason: impl Into<String>, retry: &dyn RetryPolicy) -> Result<()> {
        let reason = reason.into();
        self.transition_to(CallStatus::Failed)?;
        self.finish_attempt(Some(CallOutcome::Failed), Some(reason.clone()));

        self.record_event(CallEvent::AttemptFailed(CallAttemptFailed {
            base: CallEventBase {
                metadata: EventMetadata::new("call.attempt_failed".to_string()),
                call_id: self.id,
            },
            reason,
            attempt: self.current_attempt,
        }));

        self.maybe_reschedule(retry);
        Ok(())
    }

    /// Remote party did not answer
    pub fn mark_no_answer(&mut self, retry: &dyn RetryPolicy) -> Result<()> {
        self.transition_to(CallStatus::NoAnswer)?;
        self.finish_attempt(None, None);

        self.record_event(CallEvent::AttemptFailed(CallAttemptFailed {
            base: CallEventBase {
                metadata: EventMetadata::new("call.attempt_failed".to_string()),
                call_id: self.id,
            },
            reason: "no answer".to_string(),
            attempt: self.current_attempt,
        }));

        self.maybe_reschedule(retry);
        Ok(())
    }

    /// Remote party was busy
    pub fn mark_busy(&mut self, retry: &dyn RetryPolicy) -> Result<()> {
        self.transition_to(CallStatus::Busy)?;
        self.finish_attempt(None, None);

        self.record_event(CallEvent::AttemptFailed(CallAttemptFailed {
            base: CallEventBase {
                metadata: EventMetadata::new("call.attempt_failed".to_string()),
                call_id: self.id,
            },
            reason: "busy".to_string(),
            attempt: self.current_attempt,
        }));

        self.maybe_reschedule(retry);
        Ok(())
    }

    /// Voicemail answered; message left
    ///
    /// Does not auto-retry, but is eligible for a follow-up through the
    /// same policy as completion.
    pub fn mark_voicemail(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Voicemail)?;
        let ended_at = Utc::now();
        self.actual_end_time = Some(ended_at);
        self.outcome = Some(CallOutcome::VoicemailLeft);

        self.apply_follow_up_policy(CallOutcome::VoicemailLeft, ended_at);
        Ok(())
    }

    /// Cancel the call
    ///
    /// Valid from any non-terminal state. Cancelling an already-cancelled
    /// call is a no-op so concurrent cancellation stays safe.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.status == CallStatus::Cancelled {
            return Ok(());
        }
        let reason = reason.into();
        self.transition_to(CallStatus::Cancelled)?;
        if self.actual_start_time.is_some() {
            self.actual_end_time = Some(Utc::now());
        }

        self.record_event(CallEvent::Cancelled(CallCancelled {
            base: CallEventBase {
                metadata: EventMetadata::new("call.cancelled".to_string()),
                call_id: self.id,
            },
            reason,
        }));

        Ok(())
    }

    /// Park a scheduled call while its campaign is paused
    pub fn pause_for_campaign(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Paused)
    }

    /// Revert a campaign-paused call to Scheduled
    pub fn resume_from_pause(&mut self) -> Result<()> {
        self.transition_to(CallStatus::Scheduled)
    }

    /// Backfill analytics after the call ended
    ///
    /// The one mutation allowed in terminal states besides follow-up
    /// consumption.
    pub fn backfill_analytics<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut CallAnalytics) -> Result<()>,
    {
        f(&mut self.analytics)?;
        self.touch();
        Ok(())
    }

    /// Consume the follow-up flag once the follow-up call was created
    pub fn clear_follow_up(&mut self) {
        self.follow_up_required = false;
        self.touch();
    }

    pub fn set_transcript_ref(&mut self, reference: impl Into<String>) {
        self.transcript_ref = Some(reference.into());
        self.touch();
    }

    pub fn set_recording_ref(&mut self, reference: impl Into<String>) {
        self.recording_ref = Some(reference.into());
        self.touch();
    }

    /// Due for dialing: claimable status and scheduled time reached
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status.is_claimable() && self.scheduled_time <= now
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.current_attempt)
    }

    fn finish_attempt(&mut self, outcome: Option<CallOutcome>, notes: Option<String>) {
        self.actual_end_time = Some(Utc::now());
        if outcome.is_some() {
            self.outcome = outcome;
        }
        if notes.is_some() {
            self.outcome_notes = notes;
        }
    }

    fn maybe_reschedule(&mut self, retry: &dyn RetryPolicy) {
        if self.current_attempt >= self.max_attempts {
            return;
        }

        let delay = retry.next_retry_delay(self.current_attempt, self.retry_interval_minutes);
        let ended_at = self.actual_end_time.unwrap_or_else(Utc::now);
        let next_attempt_at = ended_at + delay;

        // Guarded by can_transition_to: Failed/NoAnswer/Busy -> Scheduled
        if self.transition_to(CallStatus::Scheduled).is_ok() {
            self.scheduled_time = next_attempt_at;
            self.session_id = None;
            self.room_name = None;

            self.record_event(CallEvent::Rescheduled(CallRescheduled {
                base: CallEventBase {
                    metadata: EventMetadata::new("call.rescheduled".to_string()),
                    call_id: self.id,
                },
                next_attempt_at,
                attempts_used: self.current_attempt,
            }));
        }
    }

    fn apply_follow_up_policy(&mut self, outcome: CallOutcome, ended_at: DateTime<Utc>) {
        if let Some(delay) = follow_up_delay(outcome) {
            let due_at = ended_at + delay;
            self.follow_up_required = true;
            self.follow_up_date = Some(due_at);

            self.record_event(CallEvent::FollowUpFlagged(FollowUpFlagged {
                base: CallEventBase {
                    metadata: EventMetadata::new("call.follow_up_flagged".to_string()),
                    call_id: self.id,
                },
                due_at,
                outcome,
            }));
        }
    }

    /// Transition to a new status
    fn transition_to(&mut self, new_status: CallStatus) -> Result<()> {
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

    /// Record a domain event
    fn record_event(&mut self, event: CallEvent) {
        self.events.push(event);
    }

    /// Take all pending events
    pub fn take_events(&mut self) -> Vec<CallEvent> {
        std::mem::take(&mut self.events)
    }

    // Getters
    pub fn id(&self) -> &CallId {
        &self.id
    }

    pub fn business_id(&self) -> &BusinessId {
        &self.business_id
    }

    pub fn campaign_id(&self) -> Option<&CampaignId> {
        self.campaign_id.as_ref()
    }

    pub fn purpose(&self) -> CallPurpose {
        self.purpose
    }

    pub fn priority(&self) -> CallPriority {
        self.priority
    }

    pub fn status(&self) -> CallStatus {
        self.status
    }

    pub fn recipient(&self) -> &CallRecipient {
        &self.recipient
    }

    pub fn script(&self) -> &CallScript {
        &self.script
    }

    pub fn scheduled_time(&self) -> DateTime<Utc> {
        self.scheduled_time
    }

    pub fn actual_start_time(&self) -> Option<DateTime<Utc>> {
        self.actual_start_time
    }

    pub fn actual_end_time(&self) -> Option<DateTime<Utc>> {
        self.actual_end_time
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn retry_interval_minutes(&self) -> u32 {
        self.retry_interval_minutes
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn room_name(&self) -> Option<&str> {
        self.room_name.as_deref()
    }

    pub fn outcome(&self) -> Option<CallOutcome> {
        self.outcome
    }

    pub fn outcome_notes(&self) -> Option<&str> {
        self.outcome_notes.as_deref()
    }

    pub fn follow_up_required(&self) -> bool {
        self.follow_up_required
    }

    pub fn follow_up_date(&self) -> Option<DateTime<Utc>> {
        self.follow_up_date
    }

    pub fn analytics(&self) -> &CallAnalytics {
        &self.analytics
    }

    pub fn transcript_ref(&self) -> Option<&str> {
        self.transcript_ref.as_deref()
    }

    pub fn recording_ref(&self) -> Option<&str> {
        self.recording_ref.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
