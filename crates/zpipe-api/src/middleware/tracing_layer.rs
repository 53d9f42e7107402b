//! # Request/Response Tracing
//!
//! `tower_http::trace::TraceLayer` with a span per request carrying the
//! method, the matched route template and the raw URI. Validation
//! warnings logged while handling a request land inside its span.

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

/// Span constructor used by [`layer`].
pub type MakeRequestSpan = fn(&Request<Body>) -> Span;

/// Build the request tracing layer for zpipe routers.
///
/// Validation rejections are 4xx responses and are not classified as
/// failures; only 5xx responses are.
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, MakeRequestSpan> {
    TraceLayer::new_for_http()
        .make_span_with(request_span as MakeRequestSpan)
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

/// One `zpipe.request` span per request.
pub fn request_span(request: &Request<Body>) -> Span {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched");
    tracing::info_span!(
        "zpipe.request",
        method = %request.method(),
        route = route,
        uri = %request.uri(),
    )
}
