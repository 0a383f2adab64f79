//! Call management API handlers

use super::dto::{
    ApiResponse, CallView, CancelCallRequest, CompleteCallRequest, CreateCallRequest,
};
use super::AppState;
use crate::domain::call::aggregate::OutboundCall;
use crate::domain::call::value_object::CallPriority;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{BusinessId, CallId, CampaignId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

pub(super) fn error_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::AlreadyExists(_) | DomainError::InvalidStateTransition(_) => {
            StatusCode::CONFLICT
        }
        DomainError::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(super) fn reject<T>(error: DomainError) -> (StatusCode, Json<ApiResponse<T>>) {
    (error_status(&error), Json(ApiResponse::error(error.to_string())))
}

/// Create and schedule a call
pub async fn create_call(
    State(state): State<AppState>,
    Json(request): Json<CreateCallRequest>,
) -> (StatusCode, Json<ApiResponse<CallView>>) {
    info!("API: creating call for business {}", request.business_id);

    let build = || -> Result<OutboundCall, DomainError> {
        let recipient = request.recipient.into_domain()?;
        let script = request.script.into_domain()?;
        let priority = CallPriority::new(request.priority.unwrap_or(3))?;

        let mut call = OutboundCall::schedule(
            BusinessId::from_uuid(request.business_id),
            recipient,
            script,
            request.purpose,
            priority,
            request.scheduled_time.unwrap_or_else(Utc::now),
        )?;

        if let Some(campaign_id) = request.campaign_id {
            call = call.with_campaign(CampaignId::from_uuid(campaign_id));
        }
        if let Some(max_attempts) = request.max_attempts {
            call = call.with_max_attempts(max_attempts)?;
        }
        if let Some(minutes) = request.retry_interval_minutes {
            call = call.with_retry_interval_minutes(minutes);
        }
        for tag in request.tags {
            call = call.with_tag(tag);
        }
        Ok(call)
    };

    let call = match build() {
        Ok(call) => call,
        Err(e) => return reject(e),
    };

    match state.call_service.create_call(call).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(CallView::from(&created))),
        ),
        Err(e) => reject(e),
    }
}

/// Get a call by ID
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<CallView>>) {
    let id = CallId::from_uuid(call_id);
    match state.call_service.get_call(&id).await {
        Ok(Some(call)) => (
            StatusCode::OK,
            Json(ApiResponse::success(CallView::from(&call))),
        ),
        Ok(None) => reject(DomainError::NotFound(format!("call {}", call_id))),
        Err(e) => reject(e),
    }
}

/// Cancel a call
pub async fn cancel_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Json(request): Json<CancelCallRequest>,
) -> (StatusCode, Json<ApiResponse<CallView>>) {
    let id = CallId::from_uuid(call_id);
    match state.call_service.cancel_call(&id, &request.reason).await {
        Ok(call) => (
            StatusCode::OK,
            Json(ApiResponse::success(CallView::from(&call))),
        ),
        Err(e) => reject(e),
    }
}

/// Report a conversation outcome (speech pipeline facing)
pub async fn complete_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Json(request): Json<CompleteCallRequest>,
) -> (StatusCode, Json<ApiResponse<CallView>>) {
    let id = CallId::from_uuid(call_id);
    let outcome = match request.outcome() {
        Ok(outcome) => outcome,
        Err(e) => return reject(e),
    };

    match state
        .call_service
        .complete_call(&id, outcome, request.notes)
        .await
    {
        Ok(call) => (
            StatusCode::OK,
            Json(ApiResponse::success(CallView::from(&call))),
        ),
        Err(e) => reject(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct DueCallsQuery {
    #[serde(default = "default_priority_threshold")]
    pub priority_threshold: u8,
}

fn default_priority_threshold() -> u8 {
    1
}

/// List due calls for a business
pub async fn list_due_calls(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
    Query(query): Query<DueCallsQuery>,
) -> (StatusCode, Json<ApiResponse<Vec<CallView>>>) {
    let business = BusinessId::from_uuid(business_id);
    match state
        .calls
        .get_due_calls(&business, query.priority_threshold, Utc::now())
        .await
    {
        Ok(calls) => {
            let views = calls.iter().map(CallView::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(views)))
        }
        Err(e) => reject(e),
    }
}

/// List active (in-flight) calls for a business
pub async fn list_active_calls(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<Vec<CallView>>>) {
    let business = BusinessId::from_uuid(business_id);
    match state.calls.get_active_calls(&business).await {
        Ok(calls) => {
            let views = calls.iter().map(CallView::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(views)))
        }
        Err(e) => reject(e),
    }
}
