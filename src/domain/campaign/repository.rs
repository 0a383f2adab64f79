//! Campaign repository interface

use crate::domain::campaign::aggregate::Campaign;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{BusinessId, CampaignId};
use async_trait::async_trait;

/// Repository interface for campaigns
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampaignRepository: Send + Sync {
    /// Persist a new campaign
    async fn create(&self, campaign: &Campaign) -> Result<()>;

    /// Find a campaign by its ID
    async fn find_by_id(&self, id: &CampaignId) -> Result<Option<Campaign>>;

    /// Save an existing campaign
    async fn update(&self, campaign: &Campaign) -> Result<()>;

    /// Delete a campaign (calls keep their campaign_id; no cascade)
    async fn delete(&self, id: &CampaignId) -> Result<()>;

    /// Campaigns belonging to a business
    async fn list_by_business(&self, business_id: &BusinessId) -> Result<Vec<Campaign>>;
}
