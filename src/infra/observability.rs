//! Logging and Prometheus metrics setup.

use std::sync::Arc;

use metrics::{Unit, counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

pub const ADMISSION_REJECTIONS_TOTAL: &str = "http_admission_rejections_total"; // labels: reason
pub const RATE_LIMIT_DECISIONS_TOTAL: &str = "rate_limit_decisions_total"; // labels: outcome
pub const HANDLER_FAILURES_TOTAL: &str = "http_handler_failures_total"; // labels: status

/// Prometheus handle for on-demand scrape output (e.g. GET /metrics).
pub type PrometheusHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Install the global tracing subscriber.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
///
/// # Errors
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    match format {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(fmt_layer.json().with_current_span(false))
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(filter)
            .with(fmt_layer.pretty())
            .try_init(),
    }
}

/// Install the global metrics recorder and return a handle for rendering.
///
/// Uses `PrometheusBuilder` without an HTTP listener; the application
/// exposes metrics via GET /metrics using `handle.render()`.
///
/// # Errors
/// Returns an error if a recorder is already installed or building fails.
pub fn init_metrics() -> Result<PrometheusHandle, metrics_exporter_prometheus::BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        ADMISSION_REJECTIONS_TOTAL,
        Unit::Count,
        "Requests rejected before reaching a route handler."
    );
    describe_counter!(
        RATE_LIMIT_DECISIONS_TOTAL,
        Unit::Count,
        "Rate limiter verdicts (passed, limited, store_error)."
    );
    describe_counter!(
        HANDLER_FAILURES_TOTAL,
        Unit::Count,
        "Server errors normalized by the error handler."
    );
}

/// Count one request rejected by the admission pipeline.
pub fn record_admission_rejection(reason: &'static str) {
    counter!(ADMISSION_REJECTIONS_TOTAL, "reason" => reason).increment(1);
}

pub fn record_rate_limit_decision(outcome: &'static str) {
    counter!(RATE_LIMIT_DECISIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_handler_failure(status: u16) {
    counter!(HANDLER_FAILURES_TOTAL, "status" => status.to_string()).increment(1);
}

/// Convenience to wrap the handle in Arc for shared use in app state.
#[must_use]
pub fn init_metrics_handle() -> Option<Arc<PrometheusHandle>> {
    init_metrics().ok().map(Arc::new)
}
