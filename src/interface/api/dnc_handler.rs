//! Do-not-call list API handlers

use super::calls_handler::reject;
use super::dto::{ApiResponse, DncRequest};
use super::AppState;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{BusinessId, PhoneNumber};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Block a number
pub async fn add_to_dnc(
    State(state): State<AppState>,
    Json(request): Json<DncRequest>,
) -> (StatusCode, Json<ApiResponse<String>>) {
    let phone = match PhoneNumber::parse(&request.phone) {
        Ok(phone) => phone,
        Err(e) => return reject(DomainError::ValidationError(e)),
    };

    let business = BusinessId::from_uuid(request.business_id);
    match state.dnc.add(&business, &phone, &request.reason).await {
        Ok(()) => {
            info!(%phone, business = %business, "number added to do-not-call list");
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(phone.to_string())),
            )
        }
        Err(e) => reject(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DncCheckQuery {
    pub business_id: Uuid,
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct DncCheckResponse {
    pub phone: String,
    pub blocked: bool,
}

/// Check whether a number is blocked
pub async fn check_dnc(
    State(state): State<AppState>,
    Query(query): Query<DncCheckQuery>,
) -> (StatusCode, Json<ApiResponse<DncCheckResponse>>) {
    let phone = match PhoneNumber::parse(&query.phone) {
        Ok(phone) => phone,
        Err(e) => return reject(DomainError::ValidationError(e)),
    };

    let business = BusinessId::from_uuid(query.business_id);
    match state.dnc.check(&business, &phone).await {
        Ok(blocked) => (
            StatusCode::OK,
            Json(ApiResponse::success(DncCheckResponse {
                phone: phone.to_string(),
                blocked,
            })),
        ),
        Err(e) => reject(e),
    }
}
