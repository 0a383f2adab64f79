//! In-memory persistence adapters
//!
//! Always compiled: the integration tests and the no-database deployment
//! run on these. The call store performs the scheduler's claim under its
//! single write lock, which makes the Scheduled -> Dialing transition and
//! the per-business concurrency check one atomic step.

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::repository::CallRepository;
use crate::domain::campaign::aggregate::Campaign;
use crate::domain::campaign::repository::CampaignRepository;
use crate::domain::dnc::{DncEntry, DoNotCallList, DoNotCallRepository};
use crate::domain::session::aggregate::VoiceSession;
use crate::domain::session::repository::SessionRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{
    BusinessId, CallId, CampaignId, PhoneNumber, SessionId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory call store
#[derive(Default)]
pub struct InMemoryCallRepository {
    calls: RwLock<HashMap<CallId, OutboundCall>>,
}

impl InMemoryCallRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ordered_due(mut calls: Vec<OutboundCall>) -> Vec<OutboundCall> {
    // Priority descending, then oldest due first
    calls.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then(a.scheduled_time().cmp(&b.scheduled_time()))
    });
    calls
}

#[async_trait]
impl CallRepository for InMemoryCallRepository {
    async fn create(&self, call: &OutboundCall) -> Result<()> {
        let mut calls = self.calls.write().await;
        if calls.contains_key(call.id()) {
            return Err(DomainError::AlreadyExists(call.id().to_string()));
        }
        calls.insert(*call.id(), call.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CallId) -> Result<Option<OutboundCall>> {
        Ok(self.calls.read().await.get(id).cloned())
    }

    async fn update(&self, call: &OutboundCall) -> Result<()> {
        let mut calls = self.calls.write().await;
        if !calls.contains_key(call.id()) {
            return Err(DomainError::NotFound(call.id().to_string()));
        }
        calls.insert(*call.id(), call.clone());
        Ok(())
    }

    async fn delete(&self, id: &CallId) -> Result<()> {
        self.calls.write().await.remove(id);
        Ok(())
    }

    async fn businesses_with_due_calls(&self, now: DateTime<Utc>) -> Result<Vec<BusinessId>> {
        let calls = self.calls.read().await;
        let mut businesses: Vec<BusinessId> = Vec::new();
        for call in calls.values() {
            if call.is_due(now) && !businesses.contains(call.business_id()) {
                businesses.push(*call.business_id());
            }
        }
        Ok(businesses)
    }

    async fn get_due_calls(
        &self,
        business_id: &BusinessId,
        priority_threshold: u8,
        now: DateTime<Utc>,
    ) -> Result<Vec<OutboundCall>> {
        let calls = self.calls.read().await;
        let due = calls
            .values()
            .filter(|c| {
                c.business_id() == business_id
                    && c.is_due(now)
                    && c.priority().value() >= priority_threshold
            })
            .cloned()
            .collect();
        Ok(ordered_due(due))
    }

    async fn get_retry_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>> {
        let calls = self.calls.read().await;
        Ok(calls
            .values()
            .filter(|c| {
                c.business_id() == business_id
                    && c.status().is_claimable()
                    && c.current_attempt() > 0
            })
            .cloned()
            .collect())
    }

    async fn get_active_calls(&self, business_id: &BusinessId) -> Result<Vec<OutboundCall>> {
        let calls = self.calls.read().await;
        Ok(calls
            .values()
            .filter(|c| c.business_id() == business_id && c.is_active())
            .cloned()
            .collect())
    }

    async fn get_next_call_in_queue(
        &self,
        business_id: &BusinessId,
        campaign_id: Option<&CampaignId>,
        now: DateTime<Utc>,
    ) -> Result<Option<OutboundCall>> {
        let due = self.get_due_calls(business_id, 1, now).await?;
        Ok(due
            .into_iter()
            .find(|c| campaign_id.map_or(true, |id| c.campaign_id() == Some(id))))
    }

    async fn claim_for_dial(
        &self,
        id: &CallId,
        session_id: SessionId,
        concurrency_limit: u32,
    ) -> Result<Option<OutboundCall>> {
        let mut calls = self.calls.write().await;

        let Some(existing) = calls.get(id) else {
            return Ok(None);
        };
        if !existing.status().is_claimable() {
            // Lost the race: another worker claimed it, or it was cancelled
            return Ok(None);
        }

        let business_id = *existing.business_id();
        let active = calls
            .values()
            .filter(|c| c.business_id() == &business_id && c.is_active())
            .count() as u32;
        if active >= concurrency_limit {
            debug!(call_id = %id, active, concurrency_limit, "claim rejected: business at limit");
            return Ok(None);
        }

        let mut claimed = existing.clone();
        if claimed.start(session_id).is_err() {
            // Attempt budget exhausted between scheduling and claim
            return Ok(None);
        }
        calls.insert(*id, claimed.clone());
        Ok(Some(claimed))
    }

    async fn get_campaign_calls(&self, campaign_id: &CampaignId) -> Result<Vec<OutboundCall>> {
        let calls = self.calls.read().await;
        Ok(calls
            .values()
            .filter(|c| c.campaign_id() == Some(campaign_id))
            .cloned()
            .collect())
    }

    async fn pause_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64> {
        let mut calls = self.calls.write().await;
        let mut affected = 0u64;
        for call in calls.values_mut() {
            if call.campaign_id() == Some(campaign_id) && call.status().is_claimable() {
                if call.pause_for_campaign().is_ok() {
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn resume_campaign_calls(&self, campaign_id: &CampaignId) -> Result<u64> {
        let mut calls = self.calls.write().await;
        let mut affected = 0u64;
        for call in calls.values_mut() {
            if call.campaign_id() == Some(campaign_id)
                && call.status() == crate::domain::call::value_object::CallStatus::Paused
            {
                if call.resume_from_pause().is_ok() {
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn get_due_follow_ups(&self, now: DateTime<Utc>) -> Result<Vec<OutboundCall>> {
        let calls = self.calls.read().await;
        Ok(calls
            .values()
            .filter(|c| {
                c.status().is_terminal()
                    && c.follow_up_required()
                    && c.follow_up_date().map_or(false, |due| due <= now)
            })
            .cloned()
            .collect())
    }
}

/// In-memory session store
#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: RwLock<HashMap<SessionId, VoiceSession>>,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &VoiceSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(session.id()) {
            return Err(DomainError::AlreadyExists(session.id().to_string()));
        }
        sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &SessionId) -> Result<Option<VoiceSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn find_by_call(&self, call_id: &CallId) -> Result<Option<VoiceSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.call_id() == Some(call_id))
            .max_by_key(|s| s.created_at())
            .cloned())
    }

    async fn update(&self, session: &VoiceSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(session.id()) {
            return Err(DomainError::NotFound(session.id().to_string()));
        }
        sessions.insert(*session.id(), session.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn get_active_sessions(&self, business_id: &BusinessId) -> Result<Vec<VoiceSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.business_id() == business_id && !s.status().is_terminal())
            .cloned()
            .collect())
    }

    async fn get_expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<VoiceSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| !s.status().is_terminal() && s.is_expired(now))
            .cloned()
            .collect())
    }

    async fn end_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut sessions = self.sessions.write().await;
        let mut ended = 0u64;
        for session in sessions.values_mut() {
            if !session.status().is_terminal() && session.is_expired(now) {
                if session.end(Some("session timeout")).is_ok() {
                    ended += 1;
                }
            }
        }
        Ok(ended)
    }
}

/// In-memory campaign store
#[derive(Default)]
pub struct InMemoryCampaignRepository {
    campaigns: RwLock<HashMap<CampaignId, Campaign>>,
}

impl InMemoryCampaignRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignRepository for InMemoryCampaignRepository {
    async fn create(&self, campaign: &Campaign) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        if campaigns.contains_key(campaign.id()) {
            return Err(DomainError::AlreadyExists(campaign.id().to_string()));
        }
        campaigns.insert(*campaign.id(), campaign.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        Ok(self.campaigns.read().await.get(id).cloned())
    }

    async fn update(&self, campaign: &Campaign) -> Result<()> {
        let mut campaigns = self.campaigns.write().await;
        if !campaigns.contains_key(campaign.id()) {
            return Err(DomainError::NotFound(campaign.id().to_string()));
        }
        campaigns.insert(*campaign.id(), campaign.clone());
        Ok(())
    }

    async fn delete(&self, id: &CampaignId) -> Result<()> {
        self.campaigns.write().await.remove(id);
        Ok(())
    }

    async fn list_by_business(&self, business_id: &BusinessId) -> Result<Vec<Campaign>> {
        let campaigns = self.campaigns.read().await;
        Ok(campaigns
            .values()
            .filter(|c| c.business_id() == business_id)
            .cloned()
            .collect())
    }
}

/// In-memory do-not-call store
#[derive(Default)]
pub struct InMemoryDncRepository {
    lists: RwLock<HashMap<BusinessId, DoNotCallList>>,
}

impl InMemoryDncRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DoNotCallRepository for InMemoryDncRepository {
    async fn check(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool> {
        let lists = self.lists.read().await;
        Ok(lists
            .get(business_id)
            .map_or(false, |list| list.contains(phone)))
    }

    async fn add(
        &self,
        business_id: &BusinessId,
        phone: &PhoneNumber,
        reason: &str,
    ) -> Result<()> {
        let mut lists = self.lists.write().await;
        lists
            .entry(*business_id)
            .or_default()
            .add(DncEntry::new(phone.clone(), reason));
        Ok(())
    }

    async fn remove(&self, business_id: &BusinessId, phone: &PhoneNumber) -> Result<bool> {
        let mut lists = self.lists.write().await;
        Ok(lists
            .get_mut(business_id)
            .map_or(false, |list| list.remove(phone)))
    }

    async fn list(&self, business_id: &BusinessId) -> Result<Vec<DncEntry>> {
        let lists = self.lists.read().await;
        Ok(lists
            .get(business_id)
            .map(|list| list.entries().cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::value_object::{
        CallPriority, CallPurpose, CallRecipient, CallScript,
    };
    use chrono::Duration;
    use std::sync::Arc;

    fn test_call(business_id: BusinessId, priority: u8, offset_minutes: i64) -> OutboundCall {
        let recipient = CallRecipient::new("Pat Doe", "+15551234567", false).unwrap();
        let script = CallScript::new("Hello").unwrap();
        OutboundCall::schedule(
            business_id,
            recipient,
            script,
            CallPurpose::LeadOutreach,
            CallPriority::new(priority).unwrap(),
            Utc::now() + Duration::minutes(offset_minutes),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_due_ordering_priority_then_time() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();

        let low_old = test_call(business, 1, -30);
        let high_new = test_call(business, 5, -5);
        let high_old = test_call(business, 5, -20);
        let future = test_call(business, 5, 30);

        for call in [&low_old, &high_new, &high_old, &future] {
            repo.create(call).await.unwrap();
        }

        let due = repo.get_due_calls(&business, 1, Utc::now()).await.unwrap();
        assert_eq!(due.len(), 3);
        assert_eq!(due[0].id(), high_old.id());
        assert_eq!(due[1].id(), high_new.id());
        assert_eq!(due[2].id(), low_old.id());
    }

    #[tokio::test]
    async fn test_priority_threshold_filters() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();

        repo.create(&test_call(business, 2, -10)).await.unwrap();
        repo.create(&test_call(business, 4, -10)).await.unwrap();

        let urgent = repo.get_due_calls(&business, 4, Utc::now()).await.unwrap();
        assert_eq!(urgent.len(), 1);
        assert_eq!(urgent[0].priority().value(), 4);
    }

    #[tokio::test]
    async fn test_claim_respects_concurrency_limit() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();

        let a = test_call(business, 3, -10);
        let b = test_call(business, 3, -10);
        repo.create(&a).await.unwrap();
        repo.create(&b).await.unwrap();

        let claimed_a = repo.claim_for_dial(a.id(), SessionId::new(), 1).await.unwrap();
        assert!(claimed_a.is_some());

        // Business at limit: second claim refused
        let claimed_b = repo.claim_for_dial(b.id(), SessionId::new(), 1).await.unwrap();
        assert!(claimed_b.is_none());
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();
        let call = test_call(business, 3, -10);
        repo.create(&call).await.unwrap();

        let first = repo.claim_for_dial(call.id(), SessionId::new(), 10).await.unwrap();
        let second = repo.claim_for_dial(call.id(), SessionId::new(), 10).await.unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_claim_refuses_cancelled_call() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();
        let mut call = test_call(business, 3, -10);
        repo.create(&call).await.unwrap();

        call.cancel("operator request").unwrap();
        repo.update(&call).await.unwrap();

        let claimed = repo.claim_for_dial(call.id(), SessionId::new(), 10).await.unwrap();
        assert!(claimed.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claims_never_exceed_limit() {
        let repo = Arc::new(InMemoryCallRepository::new());
        let business = BusinessId::new();
        let limit = 2u32;

        let mut ids = Vec::new();
        for _ in 0..8 {
            let call = test_call(business, 3, -10);
            ids.push(*call.id());
            repo.create(&call).await.unwrap();
        }

        let mut handles = Vec::new();
        for id in ids {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.claim_for_dial(&id, SessionId::new(), limit).await.unwrap()
            }));
        }

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                claimed += 1;
            }
        }

        assert_eq!(claimed, limit);
        let active = repo.get_active_calls(&business).await.unwrap();
        assert_eq!(active.len(), limit as usize);
    }

    #[tokio::test]
    async fn test_pause_resume_campaign_calls() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();
        let campaign = CampaignId::new();

        for _ in 0..3 {
            let call = test_call(business, 3, -10).with_campaign(campaign);
            repo.create(&call).await.unwrap();
        }
        // A call outside the campaign is untouched
        repo.create(&test_call(business, 3, -10)).await.unwrap();

        let paused = repo.pause_campaign_calls(&campaign).await.unwrap();
        assert_eq!(paused, 3);
        assert!(repo
            .get_due_calls(&business, 1, Utc::now())
            .await
            .unwrap()
            .iter()
            .all(|c| c.campaign_id().is_none()));

        let resumed = repo.resume_campaign_calls(&campaign).await.unwrap();
        assert_eq!(resumed, 3);
        assert_eq!(repo.get_due_calls(&business, 1, Utc::now()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_due_follow_ups() {
        let repo = InMemoryCallRepository::new();
        let business = BusinessId::new();

        let mut call = test_call(business, 3, -10);
        call.start(SessionId::new()).unwrap();
        call.mark_ringing().unwrap();
        call.mark_connected().unwrap();
        call.complete(
            crate::domain::call::value_object::CallOutcome::CallbackRequested,
            None,
        )
        .unwrap();
        repo.create(&call).await.unwrap();

        // Not yet due (2 hours out)
        let now = Utc::now();
        assert!(repo.get_due_follow_ups(now).await.unwrap().is_empty());

        let later = now + Duration::hours(3);
        let due = repo.get_due_follow_ups(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id(), call.id());
    }

    #[tokio::test]
    async fn test_end_expired_sessions() {
        use crate::domain::session::value_object::SessionKind;

        let repo = InMemorySessionRepository::new();
        let business = BusinessId::new();

        let mut expired = VoiceSession::new(business, SessionKind::OutboundCall, "room-1")
            .unwrap()
            .with_timeout_minutes(30)
            .unwrap();
        expired.start().unwrap();
        repo.create(&expired).await.unwrap();

        let mut fresh = VoiceSession::new(business, SessionKind::OutboundCall, "room-2").unwrap();
        fresh.start().unwrap();
        repo.create(&fresh).await.unwrap();

        let later = Utc::now() + Duration::minutes(31);
        let ended = repo.end_expired_sessions(later).await.unwrap();
        assert_eq!(ended, 1);

        let reloaded = repo.find_by_id(expired.id()).await.unwrap().unwrap();
        assert!(reloaded.status().is_terminal());
        let still_active = repo.find_by_id(fresh.id()).await.unwrap().unwrap();
        assert!(!still_active.status().is_terminal());
    }

    #[tokio::test]
    async fn test_dnc_check_after_add() {
        let repo = InMemoryDncRepository::new();
        let business = BusinessId::new();
        let phone = PhoneNumber::parse("+15551234567").unwrap();

        assert!(!repo.check(&business, &phone).await.unwrap());
        repo.add(&business, &phone, "customer opt-out").await.unwrap();
        assert!(repo.check(&business, &phone).await.unwrap());

        // Scoped per business
        assert!(!repo.check(&BusinessId::new(), &phone).await.unwrap());

        assert!(repo.remove(&business, &phone).await.unwrap());
        assert!(!repo.check(&business, &phone).await.unwrap());
    }
}
