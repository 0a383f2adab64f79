//! Prometheus metrics handler

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics exporter
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("install prometheus recorder");

    describe_counter!(
        "dialcast_calls_created_total",
        "Total number of outbound calls scheduled"
    );
    describe_counter!(
        "dialcast_calls_completed_total",
        "Total number of calls completed with an outcome"
    );
    describe_counter!(
        "dialcast_calls_failed_total",
        "Total number of call attempts that failed"
    );
    describe_counter!(
        "dialcast_calls_no_answer_total",
        "Total number of unanswered call attempts"
    );
    describe_counter!(
        "dialcast_calls_busy_total",
        "Total number of busy call attempts"
    );
    describe_counter!(
        "dialcast_calls_voicemail_total",
        "Total number of attempts that reached voicemail"
    );
    describe_counter!(
        "dialcast_calls_cancelled_total",
        "Total number of cancelled calls"
    );
    describe_counter!(
        "dialcast_calls_cancelled_dnc_total",
        "Calls cancelled by the do-not-call gate"
    );
    describe_counter!(
        "dialcast_dials_started_total",
        "Dial attempts handed to the transport provider"
    );
    describe_counter!(
        "dialcast_dials_failed_total",
        "Dial attempts the transport provider rejected"
    );
    describe_counter!(
        "dialcast_follow_ups_created_total",
        "Follow-up calls materialized from flagged outcomes"
    );
    describe_counter!(
        "dialcast_sessions_expired_total",
        "Sessions force-ended by the expiry sweep"
    );
    describe_gauge!(
        "dialcast_active_calls",
        "Calls currently occupying a concurrency slot, per business"
    );

    handle
}

/// HTTP metrics handler
pub async fn metrics_handler(
    axum::extract::State(prometheus_handle): axum::extract::State<PrometheusHandle>,
) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}
