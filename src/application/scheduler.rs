//! Call queue scheduler
//!
//! One or more worker loops poll for due calls and dial them, enforcing
//! the ordering and safety gates: campaign pause, do-not-call re-check,
//! dialing window, and the per-business concurrency claim. No global
//! lock serializes the queue; correctness under concurrent workers rests
//! on the repository's atomic claim.

use crate::domain::call::policy::RetryPolicy;
use crate::domain::call::repository::CallRepository;
use crate::domain::call::value_object::dialing_window_allows;
use crate::domain::campaign::aggregate::CampaignStatus;
use crate::domain::campaign::repository::CampaignRepository;
use crate::domain::dnc::DoNotCallRepository;
use crate::domain::session::aggregate::VoiceSession;
use crate::domain::session::repository::SessionRepository;
use crate::domain::session::value_object::SessionKind;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, SessionId};
use crate::infrastructure::transport::VoiceTransport;
use chrono::{Duration as ChronoDuration, Utc};
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Scheduler tuning knobs
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between polling passes
    pub poll_interval: Duration,
    /// Number of concurrent worker loops
    pub worker_count: usize,
    /// Minimum priority a call needs to be offered at all
    pub priority_threshold: u8,
    /// Active-call ceiling per business unless overridden
    pub default_concurrency_limit: u32,
    /// Per-business ceiling overrides
    pub concurrency_overrides: HashMap<BusinessId, u32>,
    /// Engine-wide offset applied before the dialing-window check
    pub utc_offset_minutes: i32,
    /// Dial budget per business per pass, so one business cannot starve
    /// the rest of a worker's pass
    pub max_dials_per_pass: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            worker_count: 2,
            priority_threshold: 1,
            default_concurrency_limit: 3,
            concurrency_overrides: HashMap::new(),
            utc_offset_minutes: 0,
            max_dials_per_pass: 10,
        }
    }
}

impl SchedulerConfig {
    pub fn limit_for(&self, business_id: &BusinessId) -> u32 {
        self.concurrency_overrides
            .get(business_id)
            .copied()
            .unwrap_or(self.default_concurrency_limit)
    }
}

/// What one pass did, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub dialed: u32,
    pub cancelled_do_not_call: u32,
    pub skipped_window: u32,
    pub skipped_paused_campaign: u32,
    pub claims_lost: u32,
}

/// Due-call dispatcher
pub struct CallScheduler {
    config: SchedulerConfig,
    calls: Arc<dyn CallRepository>,
    sessions: Arc<dyn SessionRepository>,
    campaigns: Arc<dyn CampaignRepository>,
    dnc: Arc<dyn DoNotCallRepository>,
    transport: Arc<dyn VoiceTransport>,
    retry: Arc<dyn RetryPolicy>,
}

impl CallScheduler {
    pub fn new(
        config: SchedulerConfig,
        calls: Arc<dyn CallRepository>,
        sessions: Arc<dyn SessionRepository>,
        campaigns: Arc<dyn CampaignRepository>,
        dnc: Arc<dyn DoNotCallRepository>,
        transport: Arc<dyn VoiceTransport>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        Self {
            config,
            calls,
            sessions,
            campaigns,
            dnc,
            transport,
            retry,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Worker loop: poll until shutdown flips
    pub async fn run_worker(self: Arc<Self>, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!(worker_id, "scheduler worker started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    match self.dispatch_pass().await {
                        Ok(summary) if summary.dialed > 0 => {
                            debug!(worker_id, ?summary, "dispatch pass");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(worker_id, error = %e, "dispatch pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!(worker_id, "scheduler worker stopped");
    }

    /// One polling pass over every business with due calls
    ///
    /// Ordering within a business is priority-then-time; actual dial
    /// start is best-effort since a higher-priority call may be gated by
    /// its window or the do-not-call list.
    pub async fn dispatch_pass(&self) -> Result<PassSummary> {
        let now = Utc::now();
        let mut summary = PassSummary::default();

        for business_id in self.calls.businesses_with_due_calls(now).await? {
            let limit = self.config.limit_for(&business_id);
            let due = self
                .calls
                .get_due_calls(&business_id, self.config.priority_threshold, now)
                .await?;
            let mut dials_this_business = 0usize;

            for call in due {
                if dials_this_business >= self.config.max_dials_per_pass {
                    break;
                }

                // Campaign pause gate: guards the window between a pause
                // request and its bulk status update.
                if let Some(campaign_id) = call.campaign_id() {
                    if let Some(campaign) = self.campaigns.find_by_id(campaign_id).await? {
                        if campaign.status() == CampaignStatus::Paused {
                            summary.skipped_paused_campaign += 1;
                            continue;
                        }
                    }
                }

                // Do-not-call gate: numbers can join the list after the
                // call was scheduled, so this runs before every attempt.
                if self
                    .dnc
                    .check(&business_id, call.recipient().phone())
                    .await?
                {
                    let mut blocked = call;
                    if blocked.cancel("do-not-call").is_ok() {
                        self.calls.update(&blocked).await?;
                        counter!("dialcast_calls_cancelled_dnc_total").increment(1);
                        info!(call_id = %blocked.id(), "cancelled: number on do-not-call list");
                    }
                    summary.cancelled_do_not_call += 1;
                    continue;
                }

                // Dialing-window gate: skipped, not failed; the call is
                // re-evaluated on the next pass.
                let local = (now + ChronoDuration::minutes(self.config.utc_offset_minutes as i64))
                    .time();
                if !dialing_window_allows(call.recipient().preferred_contact_time(), local) {
                    summary.skipped_window += 1;
                    continue;
                }

                // Concurrency claim: the one atomic step. Losing it is
                // normal under concurrent workers.
                let session_id = SessionId::new();
                let Some(claimed) = self
                    .calls
                    .claim_for_dial(call.id(), session_id, limit)
                    .await?
                else {
                    summary.claims_lost += 1;
                    continue;
                };

                self.dial(claimed, session_id).await?;
                summary.dialed += 1;
                dials_this_business += 1;
            }

            let active = self.calls.get_active_calls(&business_id).await?.len();
            gauge!("dialcast_active_calls", "business" => business_id.to_string())
                .set(active as f64);
        }

        Ok(summary)
    }

    /// Hand a claimed call to the transport provider
    ///
    /// Transport errors become a call failure, which runs the retry
    /// policy; the scheduler itself keeps making progress.
    async fn dial(&self, mut call: crate::domain::call::aggregate::OutboundCall, session_id: SessionId) -> Result<()> {
        counter!("dialcast_dials_started_total").increment(1);

        match self.transport.start_call(&call, session_id).await {
            Ok(room) => {
                call.set_room(&room.room_name)?;
                self.calls.update(&call).await?;

                let mut session = VoiceSession::new(
                    *call.business_id(),
                    SessionKind::OutboundCall,
                    room.room_name,
                )?
                .with_id(session_id)
                .with_call(*call.id());
                if let Some(token) = room.access_token {
                    session = session.with_room_token(token);
                }
                self.sessions.create(&session).await?;

                debug!(call_id = %call.id(), session_id = %session_id, "dial started");
                Ok(())
            }
            Err(e) => {
                warn!(call_id = %call.id(), error = %e, "transport dial failed");
                counter!("dialcast_dials_failed_total").increment(1);
                call.fail(format!("transport: {}", e), self.retry.as_ref())?;
                self.calls.update(&call).await
            }
        }
    }
}
