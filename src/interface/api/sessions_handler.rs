//! Voice session API handlers

use super::calls_handler::reject;
use super::dto::{ApiResponse, SessionView};
use super::AppState;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{BusinessId, SessionId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

/// Get a session by ID
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<SessionView>>) {
    let id = SessionId::from_uuid(session_id);
    match state.sessions.find_by_id(&id).await {
        Ok(Some(session)) => (
            StatusCode::OK,
            Json(ApiResponse::success(SessionView::from(&session))),
        ),
        Ok(None) => reject(DomainError::NotFound(format!("session {}", session_id))),
        Err(e) => reject(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct EndSessionRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// End a session
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EndSessionRequest>,
) -> (StatusCode, Json<ApiResponse<SessionView>>) {
    let id = SessionId::from_uuid(session_id);

    let mut session = match state.sessions.find_by_id(&id).await {
        Ok(Some(session)) => session,
        Ok(None) => return reject(DomainError::NotFound(format!("session {}", session_id))),
        Err(e) => return reject(e),
    };

    if let Err(e) = session.end(request.reason.as_deref()) {
        return reject(e);
    }
    if let Err(e) = state.sessions.update(&session).await {
        return reject(e);
    }

    (
        StatusCode::OK,
        Json(ApiResponse::success(SessionView::from(&session))),
    )
}

/// List active sessions for a business
pub async fn list_active_sessions(
    State(state): State<AppState>,
    Path(business_id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<Vec<SessionView>>>) {
    let business = BusinessId::from_uuid(business_id);
    match state.sessions.get_active_sessions(&business).await {
        Ok(sessions) => {
            let views = sessions.iter().map(SessionView::from).collect();
            (StatusCode::OK, Json(ApiResponse::success(views)))
        }
        Err(e) => reject(e),
    }
}
