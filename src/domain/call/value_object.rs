//! Outbound call value objects

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{ContactId, PhoneNumber};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outbound call status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Waiting for its scheduled time
    Scheduled,
    /// Handed to the dial queue, waiting for a worker
    Queued,
    /// Campaign is paused; not eligible for dialing
    Paused,
    /// Worker claimed the call and asked the transport to dial
    Dialing,
    /// Remote party is being alerted
    Ringing,
    /// Call was answered, media is up
    Connected,
    /// Conversation is running
    InProgress,
    /// Conversation finished with an outcome
    Completed,
    /// Dial or conversation failed
    Failed,
    /// Remote party did not answer
    NoAnswer,
    /// Remote party was busy
    Busy,
    /// Voicemail answered; a message was left
    Voicemail,
    /// Cancelled before completion
    Cancelled,
}

impl CallStatus {
    /// Check if a state transition is valid
    pub fn can_transition_to(&self, new_status: CallStatus) -> bool {
        use CallStatus::*;

        match (self, new_status) {
            // Scheduling states are interchangeable and claimable
            (Scheduled, Queued) => true,
            (Queued, Scheduled) => true,
            (Scheduled, Dialing) | (Queued, Dialing) => true,

            // Campaign pause parks scheduled calls; resume reverts
            (Scheduled, Paused) | (Queued, Paused) => true,
            (Paused, Scheduled) => true,

            // Dial progression
            (Dialing, Ringing) => true,
            (Ringing, Connected) => true,
            (Connected, InProgress) => true,

            // Completion is allowed once the remote party was reached
            (Ringing, Completed) | (Connected, Completed) | (InProgress, Completed) => true,

            // Failure-class endings from any in-flight state
            (Dialing, Failed) | (Ringing, Failed) | (Connected, Failed) | (InProgress, Failed) => {
                true
            }
            (Dialing, NoAnswer) | (Ringing, NoAnswer) => true,
            (Dialing, Busy) | (Ringing, Busy) => true,
            (Dialing, Voicemail) | (Ringing, Voicemail) | (Connected, Voicemail) => true,

            // Retry reschedules a failed attempt
            (Failed, Scheduled) | (NoAnswer, Scheduled) | (Busy, Scheduled) => true,

            // Cancellation from any non-terminal state
            (Scheduled, Cancelled)
            | (Queued, Cancelled)
            | (Paused, Cancelled)
            | (Dialing, Cancelled)
            | (Ringing, Cancelled)
            | (Connected, Cancelled)
            | (InProgress, Cancelled) => true,

            _ => false,
        }
    }

    /// States in which the call occupies a concurrency slot
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CallStatus::Dialing | CallStatus::Ringing | CallStatus::Connected | CallStatus::InProgress
        )
    }

    /// States from which a worker may claim the call for dialing
    pub fn is_claimable(&self) -> bool {
        matches!(self, CallStatus::Scheduled | CallStatus::Queued)
    }

    /// Terminal states that no transition may leave
    ///
    /// Failed/NoAnswer/Busy are terminal-unless-retried: the retry policy
    /// may move them back to Scheduled while attempts remain.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Failed
                | CallStatus::NoAnswer
                | CallStatus::Busy
                | CallStatus::Voicemail
                | CallStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Scheduled => "scheduled",
            CallStatus::Queued => "queued",
            CallStatus::Paused => "paused",
            CallStatus::Dialing => "dialing",
            CallStatus::Ringing => "ringing",
            CallStatus::Connected => "connected",
            CallStatus::InProgress => "in_progress",
            CallStatus::Completed => "completed",
            CallStatus::Failed => "failed",
            CallStatus::NoAnswer => "no_answer",
            CallStatus::Busy => "busy",
            CallStatus::Voicemail => "voicemail",
            CallStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(CallStatus::Scheduled),
            "queued" => Some(CallStatus::Queued),
            "paused" => Some(CallStatus::Paused),
            "dialing" => Some(CallStatus::Dialing),
            "ringing" => Some(CallStatus::Ringing),
            "connected" => Some(CallStatus::Connected),
            "in_progress" => Some(CallStatus::InProgress),
            "completed" => Some(CallStatus::Completed),
            "failed" => Some(CallStatus::Failed),
            "no_answer" => Some(CallStatus::NoAnswer),
            "busy" => Some(CallStatus::Busy),
            "voicemail" => Some(CallStatus::Voicemail),
            "cancelled" => Some(CallStatus::Cancelled),
            _ => None,
        }
    }
}

/// Conversation outcome reported by the speech pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    AppointmentScheduled,
    CustomerInterested,
    CallbackRequested,
    PartialSuccess,
    Rescheduled,
    NotInterested,
    VoicemailLeft,
    NoContact,
    DoNotCall,
    Failed,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::AppointmentScheduled => "appointment_scheduled",
            CallOutcome::CustomerInterested => "customer_interested",
            CallOutcome::CallbackRequested => "callback_requested",
            CallOutcome::PartialSuccess => "partial_success",
            CallOutcome::Rescheduled => "rescheduled",
            CallOutcome::NotInterested => "not_interested",
            CallOutcome::VoicemailLeft => "voicemail_left",
            CallOutcome::NoContact => "no_contact",
            CallOutcome::DoNotCall => "do_not_call",
            CallOutcome::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "appointment_scheduled" => Some(CallOutcome::AppointmentScheduled),
            "customer_interested" => Some(CallOutcome::CustomerInterested),
            "callback_requested" => Some(CallOutcome::CallbackRequested),
            "partial_success" => Some(CallOutcome::PartialSuccess),
            "rescheduled" => Some(CallOutcome::Rescheduled),
            "not_interested" => Some(CallOutcome::NotInterested),
            "voicemail_left" => Some(CallOutcome::VoicemailLeft),
            "no_contact" => Some(CallOutcome::NoContact),
            "do_not_call" => Some(CallOutcome::DoNotCall),
            "failed" => Some(CallOutcome::Failed),
            _ => None,
        }
    }
}

/// Why the call is being placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallPurpose {
    LeadOutreach,
    EstimateFollowUp,
    AppointmentScheduling,
    AppointmentReminder,
    PaymentReminder,
    CustomerCheckIn,
    Survey,
}

impl CallPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallPurpose::LeadOutreach => "lead_outreach",
            CallPurpose::EstimateFollowUp => "estimate_follow_up",
            CallPurpose::AppointmentScheduling => "appointment_scheduling",
            CallPurpose::AppointmentReminder => "appointment_reminder",
            CallPurpose::PaymentReminder => "payment_reminder",
            CallPurpose::CustomerCheckIn => "customer_check_in",
            CallPurpose::Survey => "survey",
        }
    }
}

/// Call priority, 1 (lowest) through 5 (emergency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallPriority(u8);

impl CallPriority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(DomainError::ValidationError(format!(
                "Priority must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn emergency() -> Self {
        Self(Self::MAX)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl Default for CallPriority {
    fn default() -> Self {
        Self(3)
    }
}

/// Recipient's preferred contact window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreferredContactTime {
    Morning,
    Afternoon,
    Evening,
}

impl PreferredContactTime {
    /// Dialing window for this preference, as local wall-clock times
    pub fn window(&self) -> (NaiveTime, NaiveTime) {
        let hm = |h| NaiveTime::from_hms_opt(h, 0, 0).expect("valid wall-clock hour");
        match self {
            PreferredContactTime::Morning => (hm(9), hm(12)),
            PreferredContactTime::Afternoon => (hm(12), hm(17)),
            PreferredContactTime::Evening => (hm(17), hm(20)),
        }
    }
}

/// Default dialing window for recipients with no stated preference (9-17)
pub fn default_dialing_window() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(9, 0, 0).expect("valid wall-clock hour"),
        NaiveTime::from_hms_opt(17, 0, 0).expect("valid wall-clock hour"),
    )
}

/// Check whether a local wall-clock time falls inside the dialing window
/// for the given preference
pub fn dialing_window_allows(preference: Option<PreferredContactTime>, local: NaiveTime) -> bool {
    let (start, end) = match preference {
        Some(p) => p.window(),
        None => default_dialing_window(),
    };
    local >= start && local < end
}

/// Who is being called
///
/// Immutable after validation. A recipient flagged do-not-call can never be
/// constructed; the flag is carried so deserialized historical records keep
/// their shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecipient {
    contact_id: Option<ContactId>,
    name: String,
    phone: PhoneNumber,
    email: Option<String>,
    preferred_contact_time: Option<PreferredContactTime>,
    timezone: Option<String>,
    language: Option<String>,
    do_not_call: bool,
}

impl CallRecipient {
    pub fn new(name: impl Into<String>, phone: &str, do_not_call: bool) -> Result<Self> {
        if do_not_call {
            return Err(DomainError::ValidationError(
                "Recipient is flagged do-not-call and cannot be scheduled".to_string(),
            ));
        }

        let phone = PhoneNumber::parse(phone).map_err(DomainError::ValidationError)?;

        Ok(Self {
            contact_id: None,
            name: name.into(),
            phone,
            email: None,
            preferred_contact_time: None,
            timezone: None,
            language: None,
            do_not_call: false,
        })
    }

    pub fn with_contact_id(mut self, contact_id: ContactId) -> Self {
        self.contact_id = Some(contact_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_preferred_contact_time(mut self, preference: PreferredContactTime) -> Self {
        self.preferred_contact_time = Some(preference);
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn contact_id(&self) -> Option<&ContactId> {
        self.contact_id.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phone(&self) -> &PhoneNumber {
        &self.phone
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn preferred_contact_time(&self) -> Option<PreferredContactTime> {
        self.preferred_contact_time
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn do_not_call(&self) -> bool {
        self.do_not_call
    }
}

/// What the agent says
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallScript {
    opening: String,
    main_talking_points: Option<String>,
    closing: Option<String>,
    objection_responses: BTreeMap<String, String>,
    questions: Vec<String>,
    call_to_action: Option<String>,
    max_duration_minutes: u32,
}

impl CallScript {
    pub const DEFAULT_MAX_DURATION_MINUTES: u32 = 10;

    pub fn new(opening: impl Into<String>) -> Result<Self> {
        let opening = opening.into();
        if opening.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Script opening text is required".to_string(),
            ));
        }

        Ok(Self {
            opening,
            main_talking_points: None,
            closing: None,
            objection_responses: BTreeMap::new(),
            questions: Vec::new(),
            call_to_action: None,
            max_duration_minutes: Self::DEFAULT_MAX_DURATION_MINUTES,
        })
    }

    pub fn with_main_talking_points(mut self, text: impl Into<String>) -> Self {
        self.main_talking_points = Some(text.into());
        self
    }

    pub fn with_closing(mut self, text: impl Into<String>) -> Self {
        self.closing = Some(text.into());
        self
    }

    pub fn with_objection_response(
        mut self,
        trigger: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.objection_responses.insert(trigger.into(), response.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.questions.push(question.into());
        self
    }

    pub fn with_call_to_action(mut self, text: impl Into<String>) -> Self {
        self.call_to_action = Some(text.into());
        self
    }

    pub fn with_max_duration_minutes(mut self, minutes: u32) -> Result<Self> {
        if minutes == 0 {
            return Err(DomainError::ValidationError(
                "Script max duration must be greater than zero".to_string(),
            ));
        }
        self.max_duration_minutes = minutes;
        Ok(self)
    }

    pub fn opening(&self) -> &str {
        &self.opening
    }

    pub fn main_talking_points(&self) -> Option<&str> {
        self.main_talking_points.as_deref()
    }

    pub fn closing(&self) -> Option<&str> {
        self.closing.as_deref()
    }

    pub fn objection_responses(&self) -> &BTreeMap<String, String> {
        &self.objection_responses
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    pub fn call_to_action(&self) -> Option<&str> {
        self.call_to_action.as_deref()
    }

    pub fn max_duration_minutes(&self) -> u32 {
        self.max_duration_minutes
    }
}

/// What was measured on the call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CallAnalytics {
    dial_attempts: u32,
    connection_duration_seconds: Option<i64>,
    talk_time_seconds: Option<i64>,
    hold_time_seconds: Option<i64>,
    sentiment_score: Option<f64>,
    engagement_score: Option<f64>,
    interruption_count: u32,
    objections_raised: u32,
    questions_asked: u32,
}

impl CallAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dial_attempt(&mut self) {
        self.dial_attempts += 1;
    }

    pub fn set_durations(&mut self, connection_seconds: i64, talk_seconds: i64) {
        self.connection_duration_seconds = Some(connection_seconds.max(0));
        self.talk_time_seconds = Some(talk_seconds.max(0));
    }

    pub fn set_hold_time_seconds(&mut self, seconds: i64) {
        self.hold_time_seconds = Some(seconds.max(0));
    }

    pub fn set_sentiment_score(&mut self, score: f64) -> Result<()> {
        if !(-1.0..=1.0).contains(&score) {
            return Err(DomainError::ValidationError(format!(
                "Sentiment score must be in [-1.0, 1.0], got {}",
                score
            )));
        }
        self.sentiment_score = Some(score);
        Ok(())
    }

    pub fn set_engagement_score(&mut self, score: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&score) {
            return Err(DomainError::ValidationError(format!(
                "Engagement score must be in [0.0, 1.0], got {}",
                score
            )));
        }
        self.engagement_score = Some(score);
        Ok(())
    }

    pub fn record_interruption(&mut self) {
        self.interruption_count += 1;
    }

    pub fn record_objection(&mut self) {
        self.objections_raised += 1;
    }

    pub fn record_question(&mut self) {
        self.questions_asked += 1;
    }

    pub fn dial_attempts(&self) -> u32 {
        self.dial_attempts
    }

    pub fn connection_duration_seconds(&self) -> Option<i64> {
        self.connection_duration_seconds
    }

    pub fn talk_time_seconds(&self) -> Option<i64> {
        self.talk_time_seconds
    }

    pub fn hold_time_seconds(&self) -> Option<i64> {
        self.hold_time_seconds
    }

    pub fn sentiment_score(&self) -> Option<f64> {
        self.sentiment_score
    }

    pub fn engagement_score(&self) -> Option<f64> {
        self.engagement_score
    }

    pub fn interruption_count(&self) -> u32 {
        self.interruption_count
    }

    pub fn objections_raised(&self) -> u32 {
        self.objections_raised
    }

    pub fn questions_asked(&self) -> u32 {
        self.questions_asked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_status_transitions() {
        assert!(CallStatus::Scheduled.can_transition_to(CallStatus::Dialing));
        assert!(CallStatus::Queued.can_transition_to(CallStatus::Dialing));
        assert!(CallStatus::Dialing.can_transition_to(CallStatus::Ringing));
        assert!(CallStatus::Ringing.can_transition_to(CallStatus::Connected));
        assert!(CallStatus::Connected.can_transition_to(CallStatus::InProgress));
        assert!(CallStatus::InProgress.can_transition_to(CallStatus::Completed));
        assert!(CallStatus::Busy.can_transition_to(CallStatus::Scheduled));
    }

    #[test]
    fn test_invalid_status_transitions() {
        assert!(!CallStatus::Scheduled.can_transition_to(CallStatus::Connected));
        assert!(!CallStatus::Completed.can_transition_to(CallStatus::Scheduled));
        assert!(!CallStatus::Cancelled.can_transition_to(CallStatus::Dialing));
        assert!(!CallStatus::Voicemail.can_transition_to(CallStatus::Scheduled));
        assert!(!CallStatus::Dialing.can_transition_to(CallStatus::Completed));
    }

    #[test]
    fn test_status_classification() {
        assert!(CallStatus::Dialing.is_active());
        assert!(CallStatus::InProgress.is_active());
        assert!(!CallStatus::Scheduled.is_active());
        assert!(CallStatus::Scheduled.is_claimable());
        assert!(CallStatus::Queued.is_claimable());
        assert!(!CallStatus::Paused.is_claimable());
        assert!(CallStatus::Completed.is_terminal());
        assert!(!CallStatus::Paused.is_terminal());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            CallStatus::Scheduled,
            CallStatus::Queued,
            CallStatus::Paused,
            CallStatus::Dialing,
            CallStatus::Ringing,
            CallStatus::Connected,
            CallStatus::InProgress,
            CallStatus::Completed,
            CallStatus::Failed,
            CallStatus::NoAnswer,
            CallStatus::Busy,
            CallStatus::Voicemail,
            CallStatus::Cancelled,
        ] {
            assert_eq!(CallStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CallStatus::parse("unknown"), None);
    }

    #[test]
    fn test_priority_bounds() {
        assert!(CallPriority::new(0).is_err());
        assert!(CallPriority::new(1).is_ok());
        assert!(CallPriority::new(5).is_ok());
        assert!(CallPriority::new(6).is_err());
        assert_eq!(CallPriority::emergency().value(), 5);
    }

    #[test]
    fn test_dialing_windows() {
        let ten = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let fifteen = NaiveTime::from_hms_opt(15, 0, 0).unwrap();
        let eighteen = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let late = NaiveTime::from_hms_opt(21, 0, 0).unwrap();

        assert!(dialing_window_allows(Some(PreferredContactTime::Morning), ten));
        assert!(!dialing_window_allows(Some(PreferredContactTime::Morning), fifteen));
        assert!(dialing_window_allows(Some(PreferredContactTime::Afternoon), fifteen));
        assert!(dialing_window_allows(Some(PreferredContactTime::Evening), eighteen));
        assert!(!dialing_window_allows(Some(PreferredContactTime::Evening), late));

        // No preference: default business hours
        assert!(dialing_window_allows(None, ten));
        assert!(!dialing_window_allows(None, eighteen));
    }

    #[test]
    fn test_recipient_do_not_call_rejected() {
        let result = CallRecipient::new("Pat Doe", "+15551234567", true);
        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_recipient_requires_phone() {
        assert!(CallRecipient::new("Pat Doe", "", false).is_err());
        assert!(CallRecipient::new("Pat Doe", "not-a-number", false).is_err());
    }

    #[test]
    fn test_recipient_builder() {
        let recipient = CallRecipient::new("Pat Doe", "+1 (555) 123-4567", false)
            .unwrap()
            .with_email("pat@example.com")
            .with_preferred_contact_time(PreferredContactTime::Evening)
            .with_timezone("America/Chicago")
            .with_language("en");

        assert_eq!(recipient.phone().as_str(), "+15551234567");
        assert_eq!(recipient.email(), Some("pat@example.com"));
        assert_eq!(
            recipient.preferred_contact_time(),
            Some(PreferredContactTime::Evening)
        );
        assert!(!recipient.do_not_call());
    }

    #[test]
    fn test_script_requires_opening() {
        assert!(CallScript::new("").is_err());
        assert!(CallScript::new("   ").is_err());
        assert!(CallScript::new("Hi, this is Dialcast.").is_ok());
    }

    #[test]
    fn test_script_max_duration_positive() {
        let script = CallScript::new("Hello").unwrap();
        assert!(script.clone().with_max_duration_minutes(0).is_err());
        assert_eq!(
            script.with_max_duration_minutes(15).unwrap().max_duration_minutes(),
            15
        );
    }

    #[test]
    fn test_analytics_score_ranges() {
        let mut analytics = CallAnalytics::new();
        assert!(analytics.set_sentiment_score(-1.5).is_err());
        assert!(analytics.set_sentiment_score(0.4).is_ok());
        assert!(analytics.set_engagement_score(1.2).is_err());
        assert!(analytics.set_engagement_score(0.9).is_ok());
        assert_eq!(analytics.sentiment_score(), Some(0.4));
    }

    #[test]
    fn test_analytics_counters() {
        let mut analytics = CallAnalytics::new();
        analytics.record_dial_attempt();
        analytics.record_dial_attempt();
        analytics.record_interruption();
        analytics.record_objection();
        analytics.record_question();

        assert_eq!(analytics.dial_attempts(), 2);
        assert_eq!(analytics.interruption_count(), 1);
        assert_eq!(analytics.objections_raised(), 1);
        assert_eq!(analytics.questions_asked(), 1);
    }

    #[test]
    fn test_analytics_durations_clamped() {
        let mut analytics = CallAnalytics::new();
        analytics.set_durations(-5, 30);
        assert_eq!(analytics.connection_duration_seconds(), Some(0));
        assert_eq!(analytics.talk_time_seconds(), Some(30));
    }
}
