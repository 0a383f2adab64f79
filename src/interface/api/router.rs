//! API router configuration

use super::calls_handler::{
    cancel_call, complete_call, create_call, get_call, list_active_calls, list_due_calls,
};
use super::campaigns_handler::{
    activate_campaign, campaign_analytics, create_campaign, get_campaign, pause_campaign,
    resume_campaign,
};
use super::dnc_handler::{add_to_dnc, check_dnc};
use super::metrics_handler::metrics_handler;
use super::sessions_handler::{end_session, get_session, list_active_sessions};
use super::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

async fn health_check() -> &'static str {
    "ok"
}

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new().route("/health", get(health_check));

    let call_routes = Router::new()
        .route("/calls", post(create_call))
        .route("/calls/:id", get(get_call))
        .route("/calls/:id/cancel", post(cancel_call))
        .route("/calls/:id/complete", post(complete_call))
        .route("/businesses/:business_id/calls/due", get(list_due_calls))
        .route("/businesses/:business_id/calls/active", get(list_active_calls));

    let campaign_routes = Router::new()
        .route("/campaigns", post(create_campaign))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/activate", post(activate_campaign))
        .route("/campaigns/:id/pause", post(pause_campaign))
        .route("/campaigns/:id/resume", post(resume_campaign))
        .route("/campaigns/:id/analytics", get(campaign_analytics));

    let session_routes = Router::new()
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/end", post(end_session))
        .route(
            "/businesses/:business_id/sessions/active",
            get(list_active_sessions),
        );

    let dnc_routes = Router::new()
        .route("/do-not-call", post(add_to_dnc))
        .route("/do-not-call/check", get(check_dnc));

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(call_routes)
        .merge(campaign_routes)
        .merge(session_routes)
        .merge(dnc_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
