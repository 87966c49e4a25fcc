//! Prometheus metrics exposition
//!
//! - `login_ui_requests_total` (counter): labels `route`, `status`
//! - `login_ui_request_duration_seconds` (histogram): label `route`
//! - `login_ui_upstream_errors_total` (counter): label `operation`

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

const DURATION_METRIC: &str = "login_ui_request_duration_seconds";

/// Bucket boundaries from 5ms up to the 15s upstream timeout
const DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0,
];

fn builder() -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(DURATION_METRIC.to_string()), DURATION_BUCKETS)
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    builder()?.install_recorder()
}

/// Record a completed request.
pub fn record_request(route: &str, status: u16, duration_secs: f64) {
    metrics::counter!(
        "login_ui_requests_total",
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(DURATION_METRIC, "route" => route.to_string()).record(duration_secs);
}

/// Record a failed upstream call by operation name.
pub fn record_upstream_error(operation: &str) {
    metrics::counter!("login_ui_upstream_errors_total", "operation" => operation.to_string())
        .increment(1);
}

/// Middleware recording request count and latency per matched route.
///
/// Unmatched paths (static UI assets) share the `fallback` label so the
/// label set stays bounded.
pub async fn track(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "fallback".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    record_request(
        &route,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}
