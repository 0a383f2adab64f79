//! Follow-up materialization job
//!
//! A qualifying outcome only flags intent and a target date on the
//! finished call; this job periodically turns due flags into fresh
//! OutboundCall instances with a new attempt budget, then consumes the
//! flag on the source call.

use crate::application::call::CallService;
use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::repository::CallRepository;
use crate::domain::shared::result::Result;
use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct FollowUpJob {
    calls: Arc<dyn CallRepository>,
    service: Arc<CallService>,
    interval: Duration,
}

impl FollowUpJob {
    pub fn new(calls: Arc<dyn CallRepository>, service: Arc<CallService>, interval: Duration) -> Self {
        Self {
            calls,
            service,
            interval,
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!("follow-up job started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    match self.run_once().await {
                        Ok(created) if created > 0 => {
                            info!(created, "follow-up calls created");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "follow-up pass failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("follow-up job stopped");
    }

    /// Materialize every due follow-up; returns how many calls were created
    pub async fn run_once(&self) -> Result<u64> {
        self.run_once_at(Utc::now()).await
    }

    /// Same pass against an explicit clock
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut created = 0u64;

        for mut source in self.calls.get_due_follow_ups(now).await? {
            let mut follow_up = OutboundCall::schedule(
                *source.business_id(),
                source.recipient().clone(),
                source.script().clone(),
                source.purpose(),
                source.priority(),
                now,
            )?
            .with_max_attempts(source.max_attempts())?
            .with_retry_interval_minutes(source.retry_interval_minutes())
            .with_tag("follow-up");

            if let Some(campaign_id) = source.campaign_id() {
                follow_up = follow_up.with_campaign(*campaign_id);
            }

            // Routed through the service so the do-not-call screen runs
            // again; a number blocked since the original call stops here.
            match self.service.create_call(follow_up).await {
                Ok(call) => {
                    created += 1;
                    counter!("dialcast_follow_ups_created_total").increment(1);
                    info!(source_call = %source.id(), follow_up_call = %call.id(), "follow-up created");
                }
                Err(e) => {
                    warn!(source_call = %source.id(), error = %e, "follow-up rejected");
                }
            }

            // Consume the flag either way so a permanently blocked number
            // is not retried forever.
            source.clear_follow_up();
            self.calls.update(&source).await?;
        }

        Ok(created)
    }
}
