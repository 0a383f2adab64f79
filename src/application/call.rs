//! Call application service
//!
//! Orchestrates the OutboundCall aggregate against its collaborators:
//! creation-time validation and do-not-call screening, 1:1 mapping of
//! transport status events onto transitions, completion handling, and
//! the session/campaign bookkeeping that follows a terminal state.

use crate::application::campaign::SuccessCriteriaConfig;
use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::policy::RetryPolicy;
use crate::domain::call::repository::CallRepository;
use crate::domain::call::value_object::CallOutcome;
use crate::domain::campaign::repository::CampaignRepository;
use crate::domain::dnc::DoNotCallRepository;
use crate::domain::session::aggregate::VoiceSession;
use crate::domain::session::repository::SessionRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, SessionId};
use crate::infrastructure::transport::{CallEndReason, TransportEvent};
use metrics::counter;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Application service for outbound calls
pub struct CallService {
    calls: Arc<dyn CallRepository>,
    sessions: Arc<dyn SessionRepository>,
    campaigns: Arc<dyn CampaignRepository>,
    dnc: Arc<dyn DoNotCallRepository>,
    retry: Arc<dyn RetryPolicy>,
    criteria: Arc<SuccessCriteriaConfig>,
}

impl CallService {
    pub fn new(
        calls: Arc<dyn CallRepository>,
        sessions: Arc<dyn SessionRepository>,
        campaigns: Arc<dyn CampaignRepository>,
        dnc: Arc<dyn DoNotCallRepository>,
        retry: Arc<dyn RetryPolicy>,
        criteria: Arc<SuccessCriteriaConfig>,
    ) -> Self {
        Self {
            calls,
            sessions,
            campaigns,
            dnc,
            retry,
            criteria,
        }
    }

    /// Persist a newly scheduled call
    ///
    /// Screens the recipient against the do-not-call list before any
    /// write happens; a blocked number never reaches the store.
    pub async fn create_call(&self, call: OutboundCall) -> Result<OutboundCall> {
        if self
            .dnc
            .check(call.business_id(), call.recipient().phone())
            .await?
        {
            return Err(DomainError::ValidationError(format!(
                "Recipient {} is on the do-not-call list",
                call.recipient().phone()
            )));
        }

        self.calls.create(&call).await?;
        counter!("dialcast_calls_created_total").increment(1);
        info!(call_id = %call.id(), business_id = %call.business_id(), "call scheduled");

        if let Some(campaign_id) = call.campaign_id() {
            if let Some(mut campaign) = self.campaigns.find_by_id(campaign_id).await? {
                campaign.record_call_created();
                self.campaigns.update(&campaign).await?;
            }
        }

        Ok(call)
    }

    pub async fn get_call(&self, id: &CallId) -> Result<Option<OutboundCall>> {
        self.calls.find_by_id(id).await
    }

    /// Cancel a call; idempotent when it is already cancelled
    pub async fn cancel_call(&self, id: &CallId, reason: &str) -> Result<OutboundCall> {
        let mut call = self.require_call(id).await?;
        call.cancel(reason)?;
        self.close_session(&mut call, "call cancelled").await?;
        self.calls.update(&call).await?;
        counter!("dialcast_calls_cancelled_total").increment(1);
        info!(call_id = %id, reason, "call cancelled");
        Ok(call)
    }

    /// Pipeline reported the conversation proper has begun
    pub async fn begin_conversation(&self, id: &CallId) -> Result<()> {
        let mut call = self.require_call(id).await?;
        call.mark_in_progress()?;
        self.calls.update(&call).await
    }

    /// Pipeline reported the conversation outcome
    pub async fn complete_call(
        &self,
        id: &CallId,
        outcome: CallOutcome,
        notes: Option<String>,
    ) -> Result<OutboundCall> {
        let mut call = self.require_call(id).await?;
        call.complete(outcome, notes)?;
        self.close_session(&mut call, "conversation completed").await?;
        self.calls.update(&call).await?;
        self.rollup_campaign(&call).await?;
        counter!("dialcast_calls_completed_total", "outcome" => outcome.as_str()).increment(1);
        info!(call_id = %id, outcome = outcome.as_str(), "call completed");
        Ok(call)
    }

    /// Apply one provider status event to the call it belongs to
    ///
    /// Transport failures funnel into the failure transitions so the
    /// retry policy runs; they are never surfaced as hard errors here.
    pub async fn apply_transport_event(&self, id: &CallId, event: TransportEvent) -> Result<()> {
        let mut call = self.require_call(id).await?;
        debug!(call_id = %id, ?event, status = call.status().as_str(), "transport event");

        match event {
            TransportEvent::Ringing => {
                call.mark_ringing()?;
                self.calls.update(&call).await?;
            }
            TransportEvent::Connected => {
                call.mark_connected()?;
                self.calls.update(&call).await?;
                self.activate_session(&call).await?;
            }
            TransportEvent::VoicemailDetected => {
                call.mark_voicemail()?;
                self.close_session(&mut call, "voicemail detected").await?;
                self.calls.update(&call).await?;
                self.rollup_campaign(&call).await?;
                counter!("dialcast_calls_voicemail_total").increment(1);
            }
            TransportEvent::Ended { reason } => {
                self.apply_ended(&mut call, reason).await?;
            }
        }
        Ok(())
    }

    /// Consume a channel of provider events until it closes
    ///
    /// State-conflict errors from stale events are logged and skipped so
    /// one bad callback cannot stall the stream.
    pub async fn run_transport_events(&self, mut events: mpsc::Receiver<(CallId, TransportEvent)>) {
        while let Some((call_id, event)) = events.recv().await {
            if let Err(e) = self.apply_transport_event(&call_id, event).await {
                warn!(call_id = %call_id, error = %e, "transport event rejected");
            }
        }
    }

    async fn apply_ended(&self, call: &mut OutboundCall, reason: CallEndReason) -> Result<()> {
        match reason {
            CallEndReason::NoAnswer => {
                call.mark_no_answer(self.retry.as_ref())?;
                counter!("dialcast_calls_no_answer_total").increment(1);
            }
            CallEndReason::Busy => {
                call.mark_busy(self.retry.as_ref())?;
                counter!("dialcast_calls_busy_total").increment(1);
            }
            CallEndReason::ProviderError(message) => {
                call.fail(format!("transport: {}", message), self.retry.as_ref())?;
                counter!("dialcast_calls_failed_total").increment(1);
            }
            CallEndReason::Hangup => {
                // A hangup before the pipeline reported an outcome: close
                // the call as reached-but-unresolved.
                if call.status().is_active() {
                    if call.complete(
                        CallOutcome::NoContact,
                        Some("remote hangup before outcome".to_string()),
                    )
                    .is_err()
                    {
                        // Hangup while still dialing counts as no answer
                        call.mark_no_answer(self.retry.as_ref())?;
                    }
                }
            }
        }

        self.close_session(call, "call ended").await?;
        self.calls.update(call).await?;
        self.rollup_campaign(call).await?;
        Ok(())
    }

    /// Pipeline processed one command inside a session
    pub async fn record_session_command(
        &self,
        session_id: &SessionId,
        command_id: &str,
        success: bool,
        response_ms: u64,
    ) -> Result<()> {
        let mut session = self.require_session(session_id).await?;
        session.record_command(command_id, success, response_ms)?;
        self.sessions.update(&session).await
    }

    /// Pipeline transcribed one conversation turn
    pub async fn append_session_transcript(
        &self,
        session_id: &SessionId,
        speaker: &str,
        text: &str,
    ) -> Result<()> {
        let mut session = self.require_session(session_id).await?;
        session.append_transcript(speaker, text)?;
        self.sessions.update(&session).await
    }

    /// Session goes Active once the remote party is connected
    async fn activate_session(&self, call: &OutboundCall) -> Result<()> {
        if let Some(session_id) = call.session_id() {
            if let Some(mut session) = self.sessions.find_by_id(session_id).await? {
                if session.start().is_ok() {
                    self.sessions.update(&session).await?;
                }
            }
        }
        Ok(())
    }

    /// End the servicing session and feed its analytics back into the call
    async fn close_session(&self, call: &mut OutboundCall, reason: &str) -> Result<()> {
        let Some(session_id) = call.session_id().copied() else {
            return Ok(());
        };
        let Some(mut session) = self.sessions.find_by_id(&session_id).await? else {
            return Ok(());
        };

        if !session.status().is_terminal() {
            if session.end(Some(reason)).is_ok() {
                self.sessions.update(&session).await?;
            }
        }

        if call.analytics().connection_duration_seconds().is_none() {
            if let Some(duration) = session.analytics().total_duration_seconds() {
                call.backfill_analytics(|a| {
                    a.set_durations(duration, duration);
                    Ok(())
                })?;
            }
        }
        if call.transcript_ref().is_none() && !session.transcript().is_empty() {
            call.set_transcript_ref(session.id().to_string());
        }
        Ok(())
    }

    /// Fold a terminal outcome into the owning campaign's rollup counters
    async fn rollup_campaign(&self, call: &OutboundCall) -> Result<()> {
        let (Some(campaign_id), Some(outcome)) = (call.campaign_id(), call.outcome()) else {
            return Ok(());
        };
        if !matches!(
            call.status(),
            crate::domain::call::value_object::CallStatus::Completed
                | crate::domain::call::value_object::CallStatus::Voicemail
        ) {
            return Ok(());
        }
        if let Some(mut campaign) = self.campaigns.find_by_id(campaign_id).await? {
            let criteria = self.criteria.resolve(call.business_id());
            campaign.record_call_completed(
                outcome,
                call.analytics().connection_duration_seconds(),
                criteria,
            );
            self.campaigns.update(&campaign).await?;
        }
        Ok(())
    }

    async fn require_call(&self, id: &CallId) -> Result<OutboundCall> {
        self.calls
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("call {}", id)))
    }

    async fn require_session(
        &self,
        id: &SessionId,
    ) -> Result<VoiceSession> {
        self.sessions
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("session {}", id)))
    }
}
