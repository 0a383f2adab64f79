//! Campaign aggregate root

use crate::domain::campaign::analytics::SuccessCriteria;
use crate::domain::call::value_object::CallOutcome;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CampaignId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campaign status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl CampaignStatus {
    pub fn can_transition_to(&self, new_status: CampaignStatus) -> bool {
        use CampaignStatus::*;

        match (self, new_status) {
            (Draft, Active) => true,
            (Active, Paused) => true,
            (Paused, Active) => true,
            (Draft, Cancelled) | (Active, Cancelled) | (Paused, Cancelled) => true,
            (Active, Completed) | (Paused, Completed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Completed | CampaignStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CampaignStatus::Draft),
            "active" => Some(CampaignStatus::Active),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            "cancelled" => Some(CampaignStatus::Cancelled),
            _ => None,
        }
    }
}

/// Campaign kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignType {
    Outreach,
    FollowUp,
    Reactivation,
    Promotion,
}

impl CampaignType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignType::Outreach => "outreach",
            CampaignType::FollowUp => "follow_up",
            CampaignType::Reactivation => "reactivation",
            CampaignType::Promotion => "promotion",
        }
    }
}

/// Campaign aggregate root
///
/// Groups outbound calls by reference: calls carry `campaign_id`, the
/// campaign never owns them exclusively, and deleting a campaign does not
/// cascade to its calls. Rollup counters are updated incrementally as
/// completions are reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    id: CampaignId,
    business_id: BusinessId,
    name: String,
    campaign_type: CampaignType,
    status: CampaignStatus,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    total_calls: u64,
    completed_calls: u64,
    successful_calls: u64,
    appointments_scheduled: u64,
    total_call_duration_seconds: i64,
    measured_calls: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Campaign {
    pub fn new(
        business_id: BusinessId,
        name: impl Into<String>,
        campaign_type: CampaignType,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "Campaign name is required".to_string(),
            ));
        }

        let now = Utc::now();
        Ok(Self {
            id: CampaignId::new(),
            business_id,
            name,
            campaign_type,
            status: CampaignStatus::Draft,
            start_date: None,
            end_date: None,
            total_calls: 0,
            completed_calls: 0,
            successful_calls: 0,
            appointments_scheduled: 0,
            total_call_duration_seconds: 0,
            measured_calls: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_dates(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if e <= s {
                return Err(DomainError::ValidationError(
                    "Campaign end date must be after the start date".to_string(),
                ));
            }
        }
        self.start_date = start;
        self.end_date = end;
        Ok(self)
    }

    pub fn activate(&mut self) -> Result<()> {
        self.transition_to(CampaignStatus::Active)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.transition_to(CampaignStatus::Paused)
    }

    pub fn resume(&mut self) -> Result<()> {
        if self.status != CampaignStatus::Paused {
            return Err(DomainError::InvalidStateTransition(
                "Can only resume a paused campaign".to_string(),
            ));
        }
        self.transition_to(CampaignStatus::Active)
    }

    pub fn complete(&mut self) -> Result<()> {
        self.transition_to(CampaignStatus::Completed)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.transition_to(CampaignStatus::Cancelled)
    }

    /// Count a newly created call toward the campaign
    pub fn record_call_created(&mut self) {
        self.total_calls += 1;
        self.touch();
    }

    /// Fold a completed call into the rollup counters
    pub fn record_call_completed(
        &mut self,
        outcome: CallOutcome,
        duration_seconds: Option<i64>,
        criteria: &SuccessCriteria,
    ) {
        self.completed_calls += 1;
        if criteria.is_success(outcome) {
            self.successful_calls += 1;
        }
        if outcome == CallOutcome::AppointmentScheduled {
            self.appointments_scheduled += 1;
        }
        if let Some(duration) = duration_seconds {
            self.total_call_duration_seconds += duration.max(0);
            self.measured_calls += 1;
        }
        self.touch();
    }

    /// Success rate as a percentage of completed calls (0 when none)
    pub fn success_rate(&self) -> f64 {
        if self.completed_calls == 0 {
            return 0.0;
        }
        self.successful_calls as f64 / self.completed_calls as f64 * 100.0
    }

    /// Average duration over calls with a measured duration
    pub fn average_call_duration_seconds(&self) -> Option<f64> {
        if self.measured_calls == 0 {
            return None;
        }
        Some(self.total_call_duration_seconds as f64 / self.measured_calls as f64)
    }

    fn transition_to(&mut self, new_status: CampaignStatus) -> Result<()> {
        if !self.status.can_transition_to(new_status) {
            return Err(DomainError::InvalidStateTransition(format!(
                "Cannot transition campaign from {:?} to {:?}",
                self.status, new_status
            )));
        }
        self.status = new_status;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // Getters
    pub fn id(&self) -> &CampaignId {
        &self.id
    }

    pub fn business_id(&self) -> &BusinessId {
        &self.business_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn campaign_type(&self) -> CampaignType {
        self.campaign_type
    }

    pub fn status(&self) -> CampaignStatus {
        self.status
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.end_date
    }

    pub fn total_calls(&self) -> u64 {
        self.total_calls
    }

    pub fn completed_calls(&self) -> u64 {
        self.completed_calls
    }

    pub fn successful_calls(&self) -> u64 {
        self.successful_calls
    }

    pub fn appointments_scheduled(&self) -> u64 {
        self.appointments_scheduled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_campaign() -> Campaign {
        Campaign::new(BusinessId::new(), "Spring reactivation", CampaignType::Reactivation)
            .unwrap()
    }

    #[test]
    fn test_requires_name() {
        assert!(Campaign::new(BusinessId::new(), " ", CampaignType::Outreach).is_err());
    }

    #[test]
    fn test_date_ordering() {
        let start = Utc::now();
        let end = start - chrono::Duration::days(1);
        assert!(test_campaign().with_dates(Some(start), Some(end)).is_err());
    }

    #[test]
    fn test_status_flow() {
        let mut campaign = test_campaign();
        assert_eq!(campaign.status(), CampaignStatus::Draft);

        campaign.activate().unwrap();
        campaign.pause().unwrap();
        campaign.resume().unwrap();
        campaign.complete().unwrap();

        assert_eq!(campaign.status(), CampaignStatus::Completed);
        assert!(campaign.activate().is_err());
    }

    #[test]
    fn test_resume_requires_paused() {
        let mut campaign = test_campaign();
        campaign.activate().unwrap();
        assert!(campaign.resume().is_err());
    }

    #[test]
    fn test_success_rate_rollup() {
        let mut campaign = test_campaign();
        let criteria = SuccessCriteria::default();

        for _ in 0..10 {
            campaign.record_call_created();
        }
        for i in 0..10 {
            let outcome = if i < 4 {
                CallOutcome::AppointmentScheduled
            } else {
                CallOutcome::NotInterested
            };
            campaign.record_call_completed(outcome, Some(120), &criteria);
        }

        assert_eq!(campaign.total_calls(), 10);
        assert_eq!(campaign.completed_calls(), 10);
        assert_eq!(campaign.successful_calls(), 4);
        assert_eq!(campaign.appointments_scheduled(), 4);
        assert!((campaign.success_rate() - 40.0).abs() < f64::EPSILON);
        assert_eq!(campaign.average_call_duration_seconds(), Some(120.0));
    }

    #[test]
    fn test_success_rate_empty() {
        assert_eq!(test_campaign().success_rate(), 0.0);
        assert_eq!(test_campaign().average_call_duration_seconds(), None);
    }

    #[test]
    fn test_unmeasured_durations_excluded() {
        let mut campaign = test_campaign();
        let criteria = SuccessCriteria::default();

        campaign.record_call_completed(CallOutcome::CustomerInterested, Some(100), &criteria);
        campaign.record_call_completed(CallOutcome::NoContact, None, &criteria);

        assert_eq!(campaign.average_call_duration_seconds(), Some(100.0));
    }
}
