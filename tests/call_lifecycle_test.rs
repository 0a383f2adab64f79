//! End-to-end call lifecycle tests over the in-memory stores

use chrono::{Duration, Utc};
use dialcast::application::{CallService, SuccessCriteriaConfig};
use dialcast::domain::call::policy::FixedIntervalRetry;
use dialcast::domain::call::value_object::{
    CallOutcome, CallPriority, CallPurpose, CallRecipient, CallScript, CallStatus,
};
use dialcast::domain::call::{CallRepository, OutboundCall};
use dialcast::domain::dnc::DoNotCallRepository;
use dialcast::domain::session::SessionRepository;
use dialcast::domain::shared::value_objects::{BusinessId, PhoneNumber, SessionId};
use dialcast::infrastructure::persistence::{
    InMemoryCallRepository, InMemoryCampaignRepository, InMemoryDncRepository,
    InMemorySessionRepository,
};
use dialcast::infrastructure::transport::{CallEndReason, TransportEvent};
use std::sync::Arc;

struct Fixture {
    calls: Arc<InMemoryCallRepository>,
    sessions: Arc<InMemorySessionRepository>,
    dnc: Arc<InMemoryDncRepository>,
    service: CallService,
    business: BusinessId,
}

fn fixture() -> Fixture {
    let calls = Arc::new(InMemoryCallRepository::new());
    let sessions = Arc::new(InMemorySessionRepository::new());
    let campaigns = Arc::new(InMemoryCampaignRepository::new());
    let dnc = Arc::new(InMemoryDncRepository::new());

    let service = CallService::new(
        calls.clone(),
        sessions.clone(),
        campaigns.clone(),
        dnc.clone(),
        Arc::new(FixedIntervalRetry),
        Arc::new(SuccessCriteriaConfig::default()),
    );

    Fixture {
        calls,
        sessions,
        dnc,
        service,
        business: BusinessId::new(),
    }
}

fn new_call(business: BusinessId, phone: &str) -> OutboundCall {
    let recipient = CallRecipient::new("Pat Doe", phone, false).unwrap();
    let script = CallScript::new("Hi, this is the scheduling assistant.").unwrap();
    OutboundCall::schedule(
        business,
        recipient,
        script,
        CallPurpose::AppointmentScheduling,
        CallPriority::new(5).unwrap(),
        Utc::now(),
    )
    .unwrap()
    .with_max_attempts(3)
    .unwrap()
    .with_retry_interval_minutes(30)
}

#[test]
fn do_not_call_recipient_fails_at_construction() {
    // The flag stops the recipient before any call object exists, so
    // nothing can reach the store.
    let result = CallRecipient::new("Pat Doe", "+15551234567", true);
    assert!(result.is_err());
}

#[tokio::test]
async fn listed_number_is_rejected_before_persistence() {
    let f = fixture();
    let phone = PhoneNumber::parse("+15551234567").unwrap();
    f.dnc.add(&f.business, &phone, "opt-out").await.unwrap();

    let call = new_call(f.business, "+15551234567");
    let id = *call.id();
    let result = f.service.create_call(call).await;

    assert!(result.is_err());
    assert!(f.calls.find_by_id(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn busy_attempt_reschedules_thirty_minutes_out() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    // Worker claims, provider reports ringing then busy
    let claimed = f
        .calls
        .claim_for_dial(&id, SessionId::new(), 5)
        .await
        .unwrap()
        .expect("claim should succeed");
    assert_eq!(claimed.status(), CallStatus::Dialing);

    f.service
        .apply_transport_event(&id, TransportEvent::Ringing)
        .await
        .unwrap();
    let before_busy = Utc::now();
    f.service
        .apply_transport_event(
            &id,
            TransportEvent::Ended {
                reason: CallEndReason::Busy,
            },
        )
        .await
        .unwrap();

    let call = f.calls.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(call.status(), CallStatus::Scheduled);
    assert_eq!(call.current_attempt(), 1);
    assert!(call.scheduled_time() >= before_busy + Duration::minutes(30));
    assert!(call.scheduled_time() <= before_busy + Duration::minutes(31));
}

#[tokio::test]
async fn callback_outcome_flags_follow_up_two_hours_out() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap().unwrap();
    f.service
        .apply_transport_event(&id, TransportEvent::Ringing)
        .await
        .unwrap();
    f.service
        .apply_transport_event(&id, TransportEvent::Connected)
        .await
        .unwrap();
    f.service.begin_conversation(&id).await.unwrap();

    let before = Utc::now();
    let call = f
        .service
        .complete_call(&id, CallOutcome::CallbackRequested, None)
        .await
        .unwrap();

    assert_eq!(call.status(), CallStatus::Completed);
    assert!(call.follow_up_required());
    let due = call.follow_up_date().unwrap();
    let expected = before + Duration::hours(2);
    assert!((due - expected).num_seconds().abs() < 10);
}

#[tokio::test]
async fn connected_event_starts_the_session() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    let session_id = SessionId::new();
    f.calls.claim_for_dial(&id, session_id, 5).await.unwrap().unwrap();

    // The scheduler would create the session after the room opened
    let session = dialcast::domain::session::VoiceSession::new(
        f.business,
        dialcast::domain::session::SessionKind::OutboundCall,
        "room-test",
    )
    .unwrap()
    .with_id(session_id)
    .with_call(id);
    f.sessions.create(&session).await.unwrap();

    f.service
        .apply_transport_event(&id, TransportEvent::Ringing)
        .await
        .unwrap();
    f.service
        .apply_transport_event(&id, TransportEvent::Connected)
        .await
        .unwrap();

    let session = f.sessions.find_by_id(&session_id).await.unwrap().unwrap();
    assert_eq!(
        session.status(),
        dialcast::domain::session::SessionStatus::Active
    );

    // Pipeline activity lands on the session
    f.service
        .append_session_transcript(&session_id, "agent", "Hi, am I speaking with Pat?")
        .await
        .unwrap();
    f.service
        .record_session_command(&session_id, "cmd-1", true, 140)
        .await
        .unwrap();
    // Redelivered command id is ignored
    f.service
        .record_session_command(&session_id, "cmd-1", false, 900)
        .await
        .unwrap();

    // Completion ends the session again
    let call = f
        .service
        .complete_call(&id, CallOutcome::CustomerInterested, None)
        .await
        .unwrap();
    let session = f.sessions.find_by_id(&session_id).await.unwrap().unwrap();
    assert!(session.status().is_terminal());
    assert_eq!(session.analytics().total_commands(), 1);
    // The transcript reference points back at the session
    assert_eq!(call.transcript_ref(), Some(session_id.to_string().as_str()));
}

#[tokio::test]
async fn voicemail_event_is_terminal_with_follow_up() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap().unwrap();
    f.service
        .apply_transport_event(&id, TransportEvent::Ringing)
        .await
        .unwrap();
    f.service
        .apply_transport_event(&id, TransportEvent::VoicemailDetected)
        .await
        .unwrap();

    let call = f.calls.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(call.status(), CallStatus::Voicemail);
    assert_eq!(call.outcome(), Some(CallOutcome::VoicemailLeft));
    assert!(call.follow_up_required());
    // Voicemail never auto-retries
    assert_eq!(call.current_attempt(), 1);
}

#[tokio::test]
async fn provider_error_funnels_into_retry() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap().unwrap();
    f.service
        .apply_transport_event(
            &id,
            TransportEvent::Ended {
                reason: CallEndReason::ProviderError("room setup failed".to_string()),
            },
        )
        .await
        .unwrap();

    let call = f.calls.find_by_id(&id).await.unwrap().unwrap();
    // Attempts remained, so the failure was rescheduled
    assert_eq!(call.status(), CallStatus::Scheduled);
    assert_eq!(call.outcome(), Some(CallOutcome::Failed));
}

#[tokio::test]
async fn cancel_twice_stays_cancelled() {
    let f = fixture();
    let call = f.service.create_call(new_call(f.business, "+15551234567")).await.unwrap();
    let id = *call.id();

    f.service.cancel_call(&id, "operator request").await.unwrap();
    let call = f.service.cancel_call(&id, "operator request").await.unwrap();
    assert_eq!(call.status(), CallStatus::Cancelled);

    // A cancelled call can never be claimed
    let claim = f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap();
    assert!(claim.is_none());
}

#[tokio::test]
async fn exhausted_retries_leave_call_failed_without_follow_up() {
    let f = fixture();
    let call = f
        .service
        .create_call(
            new_call(f.business, "+15551234567")
                .with_max_attempts(2)
                .unwrap(),
        )
        .await
        .unwrap();
    let id = *call.id();

    for _ in 0..2 {
        f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap().unwrap();
        f.service
            .apply_transport_event(
                &id,
                TransportEvent::Ended {
                    reason: CallEndReason::ProviderError("unreachable".to_string()),
                },
            )
            .await
            .unwrap();
    }

    let call = f.calls.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(call.status(), CallStatus::Failed);
    assert_eq!(call.current_attempt(), 2);
    assert!(!call.follow_up_required());

    // And the claim refuses further attempts
    let claim = f.calls.claim_for_dial(&id, SessionId::new(), 5).await.unwrap();
    assert!(claim.is_none());
}
