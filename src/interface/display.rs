//! Presentation labels for domain codes
//!
//! Human-facing strings live here, alongside the state types rather than
//! inside them: the domain enums carry only their wire codes.

use crate::domain::call::value_object::{CallOutcome, CallStatus};
use crate::domain::campaign::aggregate::CampaignStatus;
use crate::domain::session::value_object::SessionStatus;

pub fn call_status_label(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Scheduled => "Scheduled",
        CallStatus::Queued => "Queued",
        CallStatus::Paused => "Paused (campaign)",
        CallStatus::Dialing => "Dialing",
        CallStatus::Ringing => "Ringing",
        CallStatus::Connected => "Connected",
        CallStatus::InProgress => "In progress",
        CallStatus::Completed => "Completed",
        CallStatus::Failed => "Failed",
        CallStatus::NoAnswer => "No answer",
        CallStatus::Busy => "Busy",
        CallStatus::Voicemail => "Voicemail left",
        CallStatus::Cancelled => "Cancelled",
    }
}

pub fn call_outcome_label(outcome: CallOutcome) -> &'static str {
    match outcome {
        CallOutcome::AppointmentScheduled => "Appointment scheduled",
        CallOutcome::CustomerInterested => "Customer interested",
        CallOutcome::CallbackRequested => "Callback requested",
        CallOutcome::PartialSuccess => "Partial success",
        CallOutcome::Rescheduled => "Rescheduled",
        CallOutcome::NotInterested => "Not interested",
        CallOutcome::VoicemailLeft => "Voicemail left",
        CallOutcome::NoContact => "No contact",
        CallOutcome::DoNotCall => "Do not call",
        CallOutcome::Failed => "Failed",
    }
}

pub fn session_status_label(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Initializing => "Initializing",
        SessionStatus::Active => "Active",
        SessionStatus::Paused => "Paused",
        SessionStatus::Ended => "Ended",
        SessionStatus::Failed => "Failed",
    }
}

pub fn campaign_status_label(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Draft => "Draft",
        CampaignStatus::Active => "Active",
        CampaignStatus::Paused => "Paused",
        CampaignStatus::Completed => "Completed",
        CampaignStatus::Cancelled => "Cancelled",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_differ_from_codes() {
        assert_eq!(call_status_label(CallStatus::InProgress), "In progress");
        assert_eq!(CallStatus::InProgress.as_str(), "in_progress");
        assert_eq!(call_outcome_label(CallOutcome::VoicemailLeft), "Voicemail left");
    }
}
