//! API request/response mappings
//!
//! Thin translations between HTTP JSON and the domain; no business
//! logic lives here.

use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::value_object::{
    CallOutcome, CallPurpose, CallRecipient, CallScript, PreferredContactTime,
};
use crate::domain::campaign::aggregate::{Campaign, CampaignType};
use crate::domain::session::aggregate::VoiceSession;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::ContactId;
use crate::interface::display::{
    call_outcome_label, call_status_label, campaign_status_label, session_status_label,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Standard API envelope
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecipientRequest {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_contact_time: Option<PreferredContactTime>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub contact_id: Option<Uuid>,
    #[serde(default)]
    pub do_not_call: bool,
}

impl RecipientRequest {
    pub fn into_domain(self) -> Result<CallRecipient> {
        let mut recipient = CallRecipient::new(self.name, &self.phone, self.do_not_call)?;
        if let Some(email) = self.email {
            recipient = recipient.with_email(email);
        }
        if let Some(preference) = self.preferred_contact_time {
            recipient = recipient.with_preferred_contact_time(preference);
        }
        if let Some(timezone) = self.timezone {
            recipient = recipient.with_timezone(timezone);
        }
        if let Some(language) = self.language {
            recipient = recipient.with_language(language);
        }
        if let Some(contact_id) = self.contact_id {
            recipient = recipient.with_contact_id(ContactId::from_uuid(contact_id));
        }
        Ok(recipient)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScriptRequest {
    pub opening: String,
    #[serde(default)]
    pub main_talking_points: Option<String>,
    #[serde(default)]
    pub closing: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub objection_responses: BTreeMap<String, String>,
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
}

impl ScriptRequest {
    pub fn into_domain(self) -> Result<CallScript> {
        let mut script = CallScript::new(self.opening)?;
        if let Some(text) = self.main_talking_points {
            script = script.with_main_talking_points(text);
        }
        if let Some(text) = self.closing {
            script = script.with_closing(text);
        }
        if let Some(text) = self.call_to_action {
            script = script.with_call_to_action(text);
        }
        for question in self.questions {
            script = script.with_question(question);
        }
        for (trigger, response) in self.objection_responses {
            script = script.with_objection_response(trigger, response);
        }
        if let Some(minutes) = self.max_duration_minutes {
            script = script.with_max_duration_minutes(minutes)?;
        }
        Ok(script)
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCallRequest {
    pub business_id: Uuid,
    #[serde(default)]
    pub campaign_id: Option<Uuid>,
    pub purpose: CallPurpose,
    #[serde(default)]
    pub priority: Option<u8>,
    pub recipient: RecipientRequest,
    pub script: ScriptRequest,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub retry_interval_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteCallRequest {
    pub outcome: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CompleteCallRequest {
    pub fn outcome(&self) -> Result<CallOutcome> {
        CallOutcome::parse(&self.outcome)
            .ok_or_else(|| DomainError::ValidationError(format!("Unknown outcome '{}'", self.outcome)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CancelCallRequest {
    #[serde(default = "default_cancel_reason")]
    pub reason: String,
}

fn default_cancel_reason() -> String {
    "operator request".to_string()
}

#[derive(Debug, Deserialize)]
pub struct CreateCampaignRequest {
    pub business_id: Uuid,
    pub name: String,
    pub campaign_type: CampaignType,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct DncRequest {
    pub business_id: Uuid,
    pub phone: String,
    #[serde(default = "default_dnc_reason")]
    pub reason: String,
}

fn default_dnc_reason() -> String {
    "customer opt-out".to_string()
}

/// Call representation returned by the API
#[derive(Debug, Serialize)]
pub struct CallView {
    pub id: Uuid,
    pub business_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub purpose: &'static str,
    pub priority: u8,
    pub status: &'static str,
    pub status_label: &'static str,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub scheduled_time: DateTime<Utc>,
    pub actual_start_time: Option<DateTime<Utc>>,
    pub actual_end_time: Option<DateTime<Utc>>,
    pub current_attempt: u32,
    pub max_attempts: u32,
    pub session_id: Option<Uuid>,
    pub room_name: Option<String>,
    pub outcome: Option<&'static str>,
    pub outcome_label: Option<&'static str>,
    pub outcome_notes: Option<String>,
    pub follow_up_required: bool,
    pub follow_up_date: Option<DateTime<Utc>>,
    pub dial_attempts: u32,
    pub connection_duration_seconds: Option<i64>,
    pub talk_time_seconds: Option<i64>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&OutboundCall> for CallView {
    fn from(call: &OutboundCall) -> Self {
        Self {
            id: call.id().as_uuid(),
            business_id: call.business_id().as_uuid(),
            campaign_id: call.campaign_id().map(|c| c.as_uuid()),
            purpose: call.purpose().as_str(),
            priority: call.priority().value(),
            status: call.status().as_str(),
            status_label: call_status_label(call.status()),
            recipient_name: call.recipient().name().to_string(),
            recipient_phone: call.recipient().phone().to_string(),
            scheduled_time: call.scheduled_time(),
            actual_start_time: call.actual_start_time(),
            actual_end_time: call.actual_end_time(),
            current_attempt: call.current_attempt(),
            max_attempts: call.max_attempts(),
            session_id: call.session_id().map(|s| s.as_uuid()),
            room_name: call.room_name().map(String::from),
            outcome: call.outcome().map(|o| o.as_str()),
            outcome_label: call.outcome().map(call_outcome_label),
            outcome_notes: call.outcome_notes().map(String::from),
            follow_up_required: call.follow_up_required(),
            follow_up_date: call.follow_up_date(),
            dial_attempts: call.analytics().dial_attempts(),
            connection_duration_seconds: call.analytics().connection_duration_seconds(),
            talk_time_seconds: call.analytics().talk_time_seconds(),
            tags: call.tags().to_vec(),
            created_at: call.created_at(),
            updated_at: call.updated_at(),
        }
    }
}

/// Campaign representation returned by the API
#[derive(Debug, Serialize)]
pub struct CampaignView {
    pub id: Uuid,
    pub business_id: Uuid,
    pub name: String,
    pub campaign_type: &'static str,
    pub status: &'static str,
    pub status_label: &'static str,
    pub total_calls: u64,
    pub completed_calls: u64,
    pub successful_calls: u64,
    pub appointments_scheduled: u64,
    pub success_rate: f64,
    pub average_call_duration_seconds: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl From<&Campaign> for CampaignView {
    fn from(campaign: &Campaign) -> Self {
        Self {
            id: campaign.id().as_uuid(),
            business_id: campaign.business_id().as_uuid(),
            name: campaign.name().to_string(),
            campaign_type: campaign.campaign_type().as_str(),
            status: campaign.status().as_str(),
            status_label: campaign_status_label(campaign.status()),
            total_calls: campaign.total_calls(),
            completed_calls: campaign.completed_calls(),
            successful_calls: campaign.successful_calls(),
            appointments_scheduled: campaign.appointments_scheduled(),
            success_rate: campaign.success_rate(),
            average_call_duration_seconds: campaign.average_call_duration_seconds(),
            created_at: campaign.created_at(),
        }
    }
}

/// Session representation returned by the API
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub business_id: Uuid,
    pub call_id: Option<Uuid>,
    pub kind: &'static str,
    pub status: &'static str,
    pub status_label: &'static str,
    pub room_name: String,
    pub timeout_minutes: u32,
    pub emergency_mode: bool,
    pub total_commands: u64,
    pub command_success_rate: f64,
    pub total_duration_seconds: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_activity: DateTime<Utc>,
}

impl From<&VoiceSession> for SessionView {
    fn from(session: &VoiceSession) -> Self {
        Self {
            id: session.id().as_uuid(),
            business_id: session.business_id().as_uuid(),
            call_id: session.call_id().map(|c| c.as_uuid()),
            kind: session.kind().as_str(),
            status: session.status().as_str(),
            status_label: session_status_label(session.status()),
            room_name: session.room_name().to_string(),
            timeout_minutes: session.timeout_minutes(),
            emergency_mode: session.emergency_mode(),
            total_commands: session.analytics().total_commands(),
            command_success_rate: session.analytics().success_rate(),
            total_duration_seconds: session.analytics().total_duration_seconds(),
            started_at: session.started_at(),
            ended_at: session.ended_at(),
            last_activity: session.last_activity(),
        }
    }
}
