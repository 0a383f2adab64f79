//! Campaign application service

use crate::domain::call::repository::CallRepository;
use crate::domain::campaign::aggregate::Campaign;
use crate::domain::campaign::analytics::{CampaignAnalytics, SuccessCriteria};
use crate::domain::campaign::repository::CampaignRepository;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CampaignId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Per-business success-outcome configuration with an engine default
///
/// What counts as success varies by campaign goal, so the taxonomy comes
/// from configuration rather than code.
#[derive(Debug, Clone, Default)]
pub struct SuccessCriteriaConfig {
    default: SuccessCriteria,
    per_business: HashMap<BusinessId, SuccessCriteria>,
}

impl SuccessCriteriaConfig {
    pub fn new(default: SuccessCriteria) -> Self {
        Self {
            default,
            per_business: HashMap::new(),
        }
    }

    pub fn with_override(mut self, business_id: BusinessId, criteria: SuccessCriteria) -> Self {
        self.per_business.insert(business_id, criteria);
        self
    }

    pub fn resolve(&self, business_id: &BusinessId) -> &SuccessCriteria {
        self.per_business.get(business_id).unwrap_or(&self.default)
    }
}

/// Application service for campaigns
pub struct CampaignService {
    campaigns: Arc<dyn CampaignRepository>,
    calls: Arc<dyn CallRepository>,
    criteria: Arc<SuccessCriteriaConfig>,
}

impl CampaignService {
    pub fn new(
        campaigns: Arc<dyn CampaignRepository>,
        calls: Arc<dyn CallRepository>,
        criteria: Arc<SuccessCriteriaConfig>,
    ) -> Self {
        Self {
            campaigns,
            calls,
            criteria,
        }
    }

    pub async fn create_campaign(&self, campaign: Campaign) -> Result<Campaign> {
        self.campaigns.create(&campaign).await?;
        info!(campaign_id = %campaign.id(), name = campaign.name(), "campaign created");
        Ok(campaign)
    }

    pub async fn get_campaign(&self, id: &CampaignId) -> Result<Option<Campaign>> {
        self.campaigns.find_by_id(id).await
    }

    pub async fn list_campaigns(&self, business_id: &BusinessId) -> Result<Vec<Campaign>> {
        self.campaigns.list_by_business(business_id).await
    }

    pub async fn activate_campaign(&self, id: &CampaignId) -> Result<Campaign> {
        let mut campaign = self.require_campaign(id).await?;
        campaign.activate()?;
        self.campaigns.update(&campaign).await?;
        Ok(campaign)
    }

    /// Pause the campaign and park its scheduled calls
    ///
    /// Returns how many calls were parked. Parked calls are not
    /// cancelled; resuming reverts them to Scheduled.
    pub async fn pause_campaign(&self, id: &CampaignId) -> Result<u64> {
        let mut campaign = self.require_campaign(id).await?;
        campaign.pause()?;
        self.campaigns.update(&campaign).await?;

        let affected = self.calls.pause_campaign_calls(id).await?;
        info!(campaign_id = %id, affected, "campaign paused");
        Ok(affected)
    }

    /// Resume the campaign and release its parked calls
    pub async fn resume_campaign(&self, id: &CampaignId) -> Result<u64> {
        let mut campaign = self.require_campaign(id).await?;
        campaign.resume()?;
        self.campaigns.update(&campaign).await?;

        let affected = self.calls.resume_campaign_calls(id).await?;
        info!(campaign_id = %id, affected, "campaign resumed");
        Ok(affected)
    }

    pub async fn complete_campaign(&self, id: &CampaignId) -> Result<Campaign> {
        let mut campaign = self.require_campaign(id).await?;
        campaign.complete()?;
        self.campaigns.update(&campaign).await?;
        Ok(campaign)
    }

    /// Compute rollup analytics from the campaign's calls on demand
    pub async fn campaign_analytics(&self, id: &CampaignId) -> Result<CampaignAnalytics> {
        let campaign = self.require_campaign(id).await?;
        let calls = self.calls.get_campaign_calls(id).await?;
        let criteria = self.criteria.resolve(campaign.business_id());
        Ok(CampaignAnalytics::compute(&calls, criteria))
    }

    async fn require_campaign(&self, id: &CampaignId) -> Result<Campaign> {
        self.campaigns
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("campaign {}", id)))
    }
}
