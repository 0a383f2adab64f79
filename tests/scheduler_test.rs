//! Scheduler gate and concurrency tests

use chrono::{Timelike, Utc};
use dialcast::application::{
    CallScheduler, CallService, SchedulerConfig, SuccessCriteriaConfig,
};
use dialcast::domain::call::policy::FixedIntervalRetry;
use dialcast::domain::call::value_object::{
    CallPriority, CallPurpose, CallRecipient, CallScript, CallStatus,
};
use dialcast::domain::call::{CallRepository, OutboundCall};
use dialcast::domain::campaign::{Campaign, CampaignRepository, CampaignType};
use dialcast::domain::dnc::DoNotCallRepository;
use dialcast::domain::shared::value_objects::{BusinessId, PhoneNumber};
use dialcast::infrastructure::persistence::{
    InMemoryCallRepository, InMemoryCampaignRepository, InMemoryDncRepository,
    InMemorySessionRepository,
};
use dialcast::infrastructure::transport::{DialScript, SimulatedTransport, TransportEvent};
use dialcast::domain::shared::value_objects::CallId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Fixture {
    calls: Arc<InMemoryCallRepository>,
    campaigns: Arc<InMemoryCampaignRepository>,
    dnc: Arc<InMemoryDncRepository>,
    transport: Arc<SimulatedTransport>,
    business: BusinessId,
    events: Option<mpsc::Receiver<(CallId, TransportEvent)>>,
}

fn fixture() -> Fixture {
    let (tx, rx) = mpsc::channel(1024);
    Fixture {
        calls: Arc::new(InMemoryCallRepository::new()),
        campaigns: Arc::new(InMemoryCampaignRepository::new()),
        dnc: Arc::new(InMemoryDncRepository::new()),
        transport: Arc::new(
            SimulatedTransport::new(tx).with_pace(Duration::from_millis(1)),
        ),
        business: BusinessId::new(),
        events: Some(rx),
    }
}

fn scheduler(f: &Fixture, config: SchedulerConfig) -> CallScheduler {
    CallScheduler::new(
        config,
        f.calls.clone(),
        Arc::new(InMemorySessionRepository::new()),
        f.campaigns.clone(),
        f.dnc.clone(),
        f.transport.clone(),
        Arc::new(FixedIntervalRetry),
    )
}

/// An offset that lands the scheduler's local wall clock on the given
/// hour, safely inside (or outside) a dialing window
fn offset_for_local_hour(target_hour: i32) -> i32 {
    let now = Utc::now();
    (target_hour * 60) - (now.hour() as i32 * 60 + now.minute() as i32)
}

fn in_window_config() -> SchedulerConfig {
    SchedulerConfig {
        poll_interval: Duration::from_millis(10),
        utc_offset_minutes: offset_for_local_hour(10),
        ..SchedulerConfig::default()
    }
}

fn due_call(business: BusinessId, phone: &str, priority: u8) -> OutboundCall {
    let recipient = CallRecipient::new("Pat Doe", phone, false).unwrap();
    let script = CallScript::new("Hello").unwrap();
    OutboundCall::schedule(
        business,
        recipient,
        script,
        CallPurpose::LeadOutreach,
        CallPriority::new(priority).unwrap(),
        Utc::now() - chrono::Duration::minutes(1),
    )
    .unwrap()
}

#[tokio::test]
async fn dial_time_do_not_call_check_cancels() {
    let f = fixture();
    let call = due_call(f.business, "+15551234567", 3);
    f.calls.create(&call).await.unwrap();

    // The number joined the list after the call was scheduled
    let phone = PhoneNumber::parse("+15551234567").unwrap();
    f.dnc.add(&f.business, &phone, "late opt-out").await.unwrap();

    let scheduler = scheduler(&f, in_window_config());
    let summary = scheduler.dispatch_pass().await.unwrap();

    assert_eq!(summary.cancelled_do_not_call, 1);
    assert_eq!(summary.dialed, 0);

    let call = f.calls.find_by_id(call.id()).await.unwrap().unwrap();
    assert_eq!(call.status(), CallStatus::Cancelled);
}

#[tokio::test]
async fn outside_window_is_skipped_not_failed() {
    let f = fixture();
    let call = due_call(f.business, "+15551234567", 3);
    f.calls.create(&call).await.unwrap();

    // Local wall clock forced to 03:00, outside every window
    let config = SchedulerConfig {
        utc_offset_minutes: offset_for_local_hour(3),
        ..SchedulerConfig::default()
    };
    let scheduler = scheduler(&f, config);
    let summary = scheduler.dispatch_pass().await.unwrap();

    assert_eq!(summary.skipped_window, 1);
    assert_eq!(summary.dialed, 0);

    // Untouched: still due for the next pass
    let call = f.calls.find_by_id(call.id()).await.unwrap().unwrap();
    assert_eq!(call.status(), CallStatus::Scheduled);
}

#[tokio::test]
async fn paused_campaign_is_skipped() {
    let f = fixture();

    let mut campaign = Campaign::new(f.business, "Paused outreach", CampaignType::Outreach).unwrap();
    campaign.activate().unwrap();
    campaign.pause().unwrap();
    f.campaigns.create(&campaign).await.unwrap();

    let call = due_call(f.business, "+15551234567", 3).with_campaign(*campaign.id());
    f.calls.create(&call).await.unwrap();

    let scheduler = scheduler(&f, in_window_config());
    let summary = scheduler.dispatch_pass().await.unwrap();

    assert_eq!(summary.skipped_paused_campaign, 1);
    assert_eq!(summary.dialed, 0);
}

#[tokio::test]
async fn higher_priority_dials_first_under_limit() {
    let f = fixture();
    let low = due_call(f.business, "+15551110001", 2);
    let high = due_call(f.business, "+15551110002", 5);
    f.calls.create(&low).await.unwrap();
    f.calls.create(&high).await.unwrap();

    let config = SchedulerConfig {
        default_concurrency_limit: 1,
        utc_offset_minutes: offset_for_local_hour(10),
        ..SchedulerConfig::default()
    };
    let scheduler = scheduler(&f, config);
    let summary = scheduler.dispatch_pass().await.unwrap();

    assert_eq!(summary.dialed, 1);
    let high_reloaded = f.calls.find_by_id(high.id()).await.unwrap().unwrap();
    let low_reloaded = f.calls.find_by_id(low.id()).await.unwrap().unwrap();
    assert!(high_reloaded.is_active());
    assert_eq!(low_reloaded.status(), CallStatus::Scheduled);
}

#[tokio::test]
async fn concurrent_workers_respect_business_limit() {
    let f = fixture();
    let limit = 2u32;

    for i in 0..8 {
        let call = due_call(f.business, &format!("+1555222000{}", i), 3);
        f.calls.create(&call).await.unwrap();
    }

    let config = SchedulerConfig {
        default_concurrency_limit: limit,
        utc_offset_minutes: offset_for_local_hour(10),
        ..SchedulerConfig::default()
    };
    let scheduler = Arc::new(scheduler(&f, config));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let scheduler = Arc::clone(&scheduler);
        handles.push(tokio::spawn(async move {
            scheduler.dispatch_pass().await.unwrap()
        }));
    }
    let mut total_dialed = 0;
    for handle in handles {
        total_dialed += handle.await.unwrap().dialed;
    }

    // The claim kept the business at its ceiling across all workers
    assert_eq!(total_dialed, limit);
    let active = f.calls.get_active_calls(&f.business).await.unwrap();
    assert_eq!(active.len(), limit as usize);
}

#[tokio::test]
async fn transport_setup_failure_triggers_retry_policy() {
    let f = fixture();
    f.transport.script_number("+15551234567", DialScript::SetupFailure);

    let call = due_call(f.business, "+15551234567", 3);
    f.calls.create(&call).await.unwrap();

    let scheduler = scheduler(&f, in_window_config());
    scheduler.dispatch_pass().await.unwrap();

    let call = f.calls.find_by_id(call.id()).await.unwrap().unwrap();
    // Failed attempt was rescheduled by the fixed-interval policy
    assert_eq!(call.status(), CallStatus::Scheduled);
    assert_eq!(call.current_attempt(), 1);
    assert!(call.scheduled_time() > Utc::now());
}

#[tokio::test]
async fn end_to_end_busy_retry_through_event_loop() {
    let mut f = fixture();
    f.transport.script_number("+15551234567", DialScript::Busy);

    let sessions = Arc::new(InMemorySessionRepository::new());
    let campaigns = f.campaigns.clone();
    let service = Arc::new(CallService::new(
        f.calls.clone(),
        sessions.clone(),
        campaigns,
        f.dnc.clone(),
        Arc::new(FixedIntervalRetry),
        Arc::new(SuccessCriteriaConfig::default()),
    ));

    let events = f.events.take().unwrap();
    let consumer = {
        let service = service.clone();
        tokio::spawn(async move {
            service.run_transport_events(events).await;
        })
    };

    let call = due_call(f.business, "+15551234567", 5);
    let id = *call.id();
    f.calls.create(&call).await.unwrap();

    let scheduler = CallScheduler::new(
        in_window_config(),
        f.calls.clone(),
        sessions,
        f.campaigns.clone(),
        f.dnc.clone(),
        f.transport.clone(),
        Arc::new(FixedIntervalRetry),
    );
    let summary = scheduler.dispatch_pass().await.unwrap();
    assert_eq!(summary.dialed, 1);

    // Wait for the scripted ringing -> busy events to be applied
    let mut reloaded = None;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let call = f.calls.find_by_id(&id).await.unwrap().unwrap();
        if call.status() == CallStatus::Scheduled {
            reloaded = Some(call);
            break;
        }
    }
    let call = reloaded.expect("busy attempt should reschedule");

    assert_eq!(call.current_attempt(), 1);
    assert!(call.scheduled_time() >= Utc::now() + chrono::Duration::minutes(29));

    consumer.abort();
}
