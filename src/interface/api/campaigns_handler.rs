//! Campaign management API handlers

use super::calls_handler::reject;
use super::dto::{ApiResponse, CampaignView, CreateCampaignRequest};
use super::AppState;
use crate::domain::campaign::aggregate::Campaign;
use crate::domain::campaign::analytics::CampaignAnalytics;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{BusinessId, CampaignId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// Create a campaign
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(request): Json<CreateCampaignRequest>,
) -> (StatusCode, Json<ApiResponse<CampaignView>>) {
    info!("API: creating campaign '{}'", request.name);

    let campaign = match Campaign::new(
        BusinessId::from_uuid(request.business_id),
        request.name,
        request.campaign_type,
    )
    .and_then(|c| c.with_dates(request.start_date, request.end_date))
    {
        Ok(campaign) => campaign,
        Err(e) => return reject(e),
    };

    match state.campaign_service.create_campaign(campaign).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(CampaignView::from(&created))),
        ),
        Err(e) => reject(e),
    }
}

/// Get a campaign by ID
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignView>>) {
    let id = CampaignId::from_uuid(campaign_id);
    match state.campaign_service.get_campaign(&id).await {
        Ok(Some(campaign)) => (
            StatusCode::OK,
            Json(ApiResponse::success(CampaignView::from(&campaign))),
        ),
        Ok(None) => reject(DomainError::NotFound(format!("campaign {}", campaign_id))),
        Err(e) => reject(e),
    }
}

/// Activate a campaign
pub async fn activate_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignView>>) {
    let id = CampaignId::from_uuid(campaign_id);
    match state.campaign_service.activate_campaign(&id).await {
        Ok(campaign) => (
            StatusCode::OK,
            Json(ApiResponse::success(CampaignView::from(&campaign))),
        ),
        Err(e) => reject(e),
    }
}

#[derive(Debug, Serialize)]
pub struct AffectedCallsResponse {
    pub affected_calls: u64,
}

/// Pause a campaign and park its scheduled calls
pub async fn pause_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<AffectedCallsResponse>>) {
    let id = CampaignId::from_uuid(campaign_id);
    match state.campaign_service.pause_campaign(&id).await {
        Ok(affected) => (
            StatusCode::OK,
            Json(ApiResponse::success(AffectedCallsResponse {
                affected_calls: affected,
            })),
        ),
        Err(e) => reject(e),
    }
}

/// Resume a paused campaign
pub async fn resume_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<AffectedCallsResponse>>) {
    let id = CampaignId::from_uuid(campaign_id);
    match state.campaign_service.resume_campaign(&id).await {
        Ok(affected) => (
            StatusCode::OK,
            Json(ApiResponse::success(AffectedCallsResponse {
                affected_calls: affected,
            })),
        ),
        Err(e) => reject(e),
    }
}

/// Rollup analytics for a campaign
pub async fn campaign_analytics(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CampaignAnalytics>>) {
    let id = CampaignId::from_uuid(campaign_id);
    match state.campaign_service.campaign_analytics(&id).await {
        Ok(analytics) => (StatusCode::OK, Json(ApiResponse::success(analytics))),
        Err(e) => reject(e),
    }
}
