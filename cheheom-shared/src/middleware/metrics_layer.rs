use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

const REQUESTS_TOTAL: &str = "cheheom_http_requests_total";
const REQUEST_DURATION: &str = "cheheom_http_request_duration_seconds";
const REQUEST_FAILURES: &str = "cheheom_http_request_failures_total";

const DURATION_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0, 5.0];

/// Unmatched requests share one label so raw URIs never become series.
fn route_label(matched: Option<&MatchedPath>) -> String {
    matched.map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string())
}

fn status_class(status: u16) -> &'static str {
    match status {
        500.. => "server_error",
        400..=499 => "client_error",
        _ => "ok",
    }
}

pub async fn metrics_middleware(
    matched_path: Option<MatchedPath>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let route = route_label(matched_path.as_ref());
    // Scrapes are not traffic.
    if route == "/metrics" {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().to_string();
    let response = next.run(req).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16();
    let class = status_class(status);
    let labels = [
        ("method", method),
        ("route", route),
        ("status", status.to_string()),
    ];

    counter!(REQUESTS_TOTAL, &labels).increment(1);
    histogram!(REQUEST_DURATION, &labels).record(duration);
    if class != "ok" {
        counter!(REQUEST_FAILURES, "route" => labels[1].1.clone(), "class" => class).increment(1);
    }

    response
}

/// Installs the global Prometheus recorder, tagging every series with `service`.
/// Only one recorder may exist per process.
pub fn init_metrics(service: &str) -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new()
        .add_global_label("service", service)
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), &DURATION_BUCKETS)?
        .install_recorder()
}
