//! Campaign bounded context - call grouping and rollup analytics

pub mod aggregate;
pub mod analytics;
pub mod repository;

pub use aggregate::{Campaign, CampaignStatus, CampaignType};
pub use analytics::{CampaignAnalytics, DurationPercentiles, SuccessCriteria};
pub use repository::CampaignRepository;
