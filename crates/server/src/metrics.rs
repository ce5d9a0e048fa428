//! Prometheus metrics
//!
//! The recorder is installed once per process; `/metrics` renders it.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder, returning the existing handle on repeat calls
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PROMETHEUS.get_or_try_init(|| PrometheusBuilder::new().install_recorder()) {
        Ok(handle) => Some(handle.clone()),
        Err(e) => {
            tracing::warn!(error = %e, "Could not install Prometheus recorder");
            None
        }
    }
}

pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed".to_string(),
        ),
    }
}

pub fn record_session_created() {
    ::metrics::counter!("dealer_assist_sessions_created_total").increment(1);
}

pub fn record_active_sessions(count: usize) {
    ::metrics::gauge!("dealer_assist_active_sessions").set(count as f64);
}

/// One completed chat turn
pub fn record_chat_turn(latency_ms: u64, fields_extracted: usize) {
    ::metrics::counter!("dealer_assist_chat_turns_total").increment(1);
    ::metrics::histogram!("dealer_assist_chat_latency_ms").record(latency_ms as f64);
    ::metrics::counter!("dealer_assist_fields_extracted_total").increment(fields_extracted as u64);
}

pub fn record_document(outcome: &'static str) {
    ::metrics::counter!("dealer_assist_documents_total", "outcome" => outcome).increment(1);
}

pub fn record_error(kind: &'static str) {
    ::metrics::counter!("dealer_assist_errors_total", "kind" => kind).increment(1);
}
