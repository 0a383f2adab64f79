//! REST API layer - thin request/response mappings over the application
//! services

pub mod calls_handler;
pub mod campaigns_handler;
pub mod dnc_handler;
pub mod dto;
pub mod metrics_handler;
pub mod router;
pub mod sessions_handler;

pub use dto::ApiResponse;
pub use metrics_handler::init_metrics;
pub use router::build_router;

use crate::application::{CallService, CampaignService};
use crate::domain::call::repository::CallRepository;
use crate::domain::dnc::DoNotCallRepository;
use crate::domain::session::repository::SessionRepository;
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub call_service: Arc<CallService>,
    pub campaign_service: Arc<CampaignService>,
    pub calls: Arc<dyn CallRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub dnc: Arc<dyn DoNotCallRepository>,
}
