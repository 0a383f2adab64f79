//! Outbound call repository interface

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CallId, CampaignId, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface for the OutboundCall aggregate
///
/// Defined in the domain layer as a trait (port), implemented in the
/// infrastructure layer (adapter). `claim_for_dial` is the scheduler's
/// atomic claim: it must perform the Scheduled/Queued -> Dialing
/// transition and the per-business concurrency check as one atomic step.
#[async_trait]
pub trait CallRepository: Send + Sync {
    /// Persist a new call
    async fn create(&self, call: &OutboundCall) -> Result<()>;

    /// Find a call by its ID
    async fn find_by_id(&self, id: &CallId) -> Result<Option<OutboundCall>>;

    /// Save an existing call
    async fn update(&self, call: &OutboundCall) -> Result<()>;

    /// Delete a call
    async fn delete(&self, id: &CallId) -> Result<()>;

    /// Businesses that currently have due calls, for scheduler iteration
    async fn businesses_with_due_calls(&self, now: DateTime<Utc>) -> Result<Vec<BusinessId>>;

    /// Due calls for one business at or above the priority threshold,
    /// ordered priority descending then scheduled time ascending
    async fn get_due_calls(
        &self,
        business_id: &BusinessId,
        priority_threshold: u8,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundCall>>;

    /// Calls waiting on a retry (rescheduled after a failed attempt)
    async fn get_retry_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>>;

    /// Calls currently occupying a concurrency slot
    async fn get_active_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>>;

    /// Head of the dial queue for a business, optionally per campaign
    async fn get_next_call_in_queue(
        &self,
        business_id: &BusinessId,
        campaign_id: Option<&CampaignId>,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboundCall>>;

    /// Atomically claim a call for dialing
    ///
    /// Performs the call's `start` transition only if the call is still
    /// claimable and the business has fewer than `concurrency_limit`
    /// active calls. Returns the claimed call, or `None` when the claim
    /// was lost (already claimed, cancelled, or the business is at its
    /// limit).
    async fn claim_for_dial(
        &self,
        id: &CallId,
        session_id: SessionId,
        concurrency_limit: u32,
    ) -> Result<Option<OutboundCall>>;

    /// All calls belonging to a campaign
    async fn get_campaign_calls(&self, campaign_id: &CampaignId) -> Result<Vec<OutboundCall>>;

    /// Park a campaign's Scheduled/Queued calls; returns affected count
    async fn pause_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64>;

    /// Revert a campaign's Paused calls to Scheduled; returns affected count
    async fn resume_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64>;

    /// Terminal calls with a follow-up flagged and due
    async fn get_due_follow_ups(&self, now: DateTime<Utc>) -> Result<Vec<OutboundCall>>;
}
