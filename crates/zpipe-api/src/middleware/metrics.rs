//! # Request Metrics
//!
//! HTTP-level counters and latency recorded through the `metrics` facade.
//! No exporter is installed here; the embedding binary chooses one.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Total requests, labelled by method, route and status.
pub const HTTP_REQUESTS_METRIC: &str = "zpipe_http_requests_total";

/// Request latency in seconds, labelled by method and route.
pub const HTTP_DURATION_METRIC: &str = "zpipe_http_request_duration_seconds";

/// Middleware recording request count and latency.
///
/// Routes are labelled by their template (`/users/{id}`), never the raw
/// URI, to keep label cardinality bounded.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::counter!(
        HTTP_REQUESTS_METRIC,
        "method" => method.clone(),
        "path" => route.clone(),
        "status" => status
    )
    .increment(1);
    metrics::histogram!(HTTP_DURATION_METRIC, "method" => method, "path" => route)
        .record(started.elapsed().as_secs_f64());

    response
}
