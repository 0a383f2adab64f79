//! Campaign management, follow-up materialization and session sweep tests

use chrono::{Duration as ChronoDuration, Utc};
use dialcast::application::{
    CallService, CampaignService, FollowUpJob, SessionSweeper, SuccessCriteriaConfig,
};
use dialcast::domain::call::policy::FixedIntervalRetry;
use dialcast::domain::call::value_object::{
    CallOutcome, CallPriority, CallPurpose, CallRecipient, CallScript,
};
use dialcast::domain::call::{CallRepository, OutboundCall};
use dialcast::domain::campaign::{Campaign, CampaignRepository, CampaignStatus, CampaignType};
use dialcast::domain::session::{SessionKind, SessionRepository, VoiceSession};
use dialcast::domain::shared::value_objects::{BusinessId, SessionId};
use dialcast::infrastructure::persistence::{
    InMemoryCallRepository, InMemoryCampaignRepository, InMemoryDncRepository,
    InMemorySessionRepository,
};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    calls: Arc<InMemoryCallRepository>,
    sessions: Arc<InMemorySessionRepository>,
    campaigns: Arc<InMemoryCampaignRepository>,
    call_service: Arc<CallService>,
    campaign_service: CampaignService,
    business: BusinessId,
}

fn fixture() -> Fixture {
    let calls = Arc::new(InMemoryCallRepository::new());
    let sessions = Arc::new(InMemorySessionRepository::new());
    let campaigns = Arc::new(InMemoryCampaignRepository::new());
    let dnc = Arc::new(InMemoryDncRepository::new());
    let criteria = Arc::new(SuccessCriteriaConfig::default());

    let call_service = Arc::new(CallService::new(
        calls.clone(),
        sessions.clone(),
        campaigns.clone(),
        dnc.clone(),
        Arc::new(FixedIntervalRetry),
        criteria.clone(),
    ));
    let campaign_service = CampaignService::new(campaigns.clone(), calls.clone(), criteria);

    Fixture {
        calls,
        sessions,
        campaigns,
        call_service,
        campaign_service,
        business: BusinessId::new(),
    }
}

fn new_call(business: BusinessId, phone: &str) -> OutboundCall {
    let recipient = CallRecipient::new("Pat Doe", phone, false).unwrap();
    let script = CallScript::new("Hello").unwrap();
    OutboundCall::schedule(
        business,
        recipient,
        script,
        CallPurpose::LeadOutreach,
        CallPriority::default(),
        Utc::now(),
    )
    .unwrap()
}

async fn run_to_completion(f: &Fixture, call_id: &dialcast::domain::shared::value_objects::CallId, outcome: CallOutcome) {
    f.calls
        .claim_for_dial(call_id, SessionId::new(), 100)
        .await
        .unwrap()
        .unwrap();
    use dialcast::infrastructure::transport::TransportEvent;
    f.call_service
        .apply_transport_event(call_id, TransportEvent::Ringing)
        .await
        .unwrap();
    f.call_service
        .apply_transport_event(call_id, TransportEvent::Connected)
        .await
        .unwrap();
    f.call_service.complete_call(call_id, outcome, None).await.unwrap();
}

#[tokio::test]
async fn pause_parks_calls_and_resume_releases_them() {
    let f = fixture();

    let mut campaign = Campaign::new(f.business, "Outreach wave 1", CampaignType::Outreach).unwrap();
    campaign.activate().unwrap();
    f.campaigns.create(&campaign).await.unwrap();

    for i in 0..5 {
        let call = new_call(f.business, &format!("+1555333000{}", i)).with_campaign(*campaign.id());
        f.call_service.create_call(call).await.unwrap();
    }

    let paused = f.campaign_service.pause_campaign(campaign.id()).await.unwrap();
    assert_eq!(paused, 5);

    let reloaded = f.campaigns.find_by_id(campaign.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.status(), CampaignStatus::Paused);

    // Parked, not cancelled: nothing is due
    let due = f.calls.get_due_calls(&f.business, 1, Utc::now()).await.unwrap();
    assert!(due.is_empty());

    let resumed = f.campaign_service.resume_campaign(campaign.id()).await.unwrap();
    assert_eq!(resumed, 5);
    let due = f.calls.get_due_calls(&f.business, 1, Utc::now()).await.unwrap();
    assert_eq!(due.len(), 5);
}

#[tokio::test]
async fn campaign_analytics_success_rate() {
    let f = fixture();

    let mut campaign = Campaign::new(f.business, "Win-back", CampaignType::Reactivation).unwrap();
    campaign.activate().unwrap();
    f.campaigns.create(&campaign).await.unwrap();

    for i in 0..10 {
        let call = new_call(f.business, &format!("+155544400{:02}", i)).with_campaign(*campaign.id());
        let created = f.call_service.create_call(call).await.unwrap();
        let outcome = if i < 4 {
            CallOutcome::AppointmentScheduled
        } else {
            CallOutcome::NotInterested
        };
        run_to_completion(&f, created.id(), outcome).await;
    }

    let analytics = f.campaign_service.campaign_analytics(campaign.id()).await.unwrap();
    assert_eq!(analytics.total_calls, 10);
    assert_eq!(analytics.completed_calls, 10);
    assert_eq!(analytics.successful_calls, 4);
    assert!((analytics.success_rate - 40.0).abs() < f64::EPSILON);
    assert_eq!(analytics.appointments_scheduled, 4);
    assert!(analytics.duration_percentiles.is_some());

    // Incremental rollups agree with the computed aggregate
    let campaign = f.campaigns.find_by_id(campaign.id()).await.unwrap().unwrap();
    assert_eq!(campaign.completed_calls(), 10);
    assert_eq!(campaign.successful_calls(), 4);
    assert!((campaign.success_rate() - 40.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn follow_up_job_materializes_due_flags() {
    let f = fixture();

    let call = f
        .call_service
        .create_call(new_call(f.business, "+15551234567"))
        .await
        .unwrap();
    let id = *call.id();
    run_to_completion(&f, &id, CallOutcome::CallbackRequested).await;

    let job = FollowUpJob::new(
        f.calls.clone(),
        f.call_service.clone(),
        Duration::from_secs(60),
    );

    // Nothing due yet: the callback window is two hours out
    assert_eq!(job.run_once().await.unwrap(), 0);

    // Run the pass against a clock past the follow-up window
    let later = Utc::now() + ChronoDuration::hours(3);
    let created = job.run_once_at(later).await.unwrap();
    assert_eq!(created, 1);

    // Source flag consumed; a fresh call with a full attempt budget exists
    let source = f.calls.find_by_id(&id).await.unwrap().unwrap();
    assert!(!source.follow_up_required());

    let due_calls = f.calls.get_due_calls(&f.business, 1, later).await.unwrap();
    assert_eq!(due_calls.len(), 1);
    let follow_up = &due_calls[0];
    assert_eq!(follow_up.current_attempt(), 0);
    assert!(follow_up.tags().contains(&"follow-up".to_string()));
}

#[tokio::test]
async fn sweeper_force_ends_expired_sessions() {
    let f = fixture();

    let mut hung = VoiceSession::new(f.business, SessionKind::PersonalAssistant, "room-hung")
        .unwrap()
        .with_timeout_minutes(1)
        .unwrap();
    hung.start().unwrap();
    f.sessions.create(&hung).await.unwrap();

    let sweeper = SessionSweeper::new(f.sessions.clone(), Duration::from_secs(60));

    // Not yet expired
    assert_eq!(sweeper.run_once().await.unwrap(), 0);

    // Simulate the timeout elapsing
    tokio::time::sleep(Duration::from_millis(10)).await;
    let ended = f
        .sessions
        .end_expired_sessions(Utc::now() + ChronoDuration::minutes(2))
        .await
        .unwrap();
    assert_eq!(ended, 1);

    let reloaded = f.sessions.find_by_id(hung.id()).await.unwrap().unwrap();
    assert!(reloaded.status().is_terminal());
    assert!(reloaded.analytics().total_duration_seconds().is_some());
}
