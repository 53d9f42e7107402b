//! # OpenAPI Document Assembly
//!
//! Builds the OpenAPI document from registered [`HandlerOperation`]s.
//! Every schema in it comes from the same [`zpipe_schema::Schema`] values
//! the pipes validate with, so the document and the runtime checks
//! cannot drift apart.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::path::{HttpMethod, PathItemBuilder};
use utoipa::openapi::{ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder};

use crate::config::ApiConfig;
use crate::operation::{validation_error_schema, HandlerOperation};

/// Component name of the shared error body schema.
pub const VALIDATION_ERROR_COMPONENT: &str = "ValidationErrorBody";

fn http_method(method: &axum::http::Method) -> Option<HttpMethod> {
    Some(match method.as_str() {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        "HEAD" => HttpMethod::Head,
        "OPTIONS" => HttpMethod::Options,
        "TRACE" => HttpMethod::Trace,
        _ => return None,
    })
}

/// Assemble the document for `operations`.
///
/// Operations sharing a path are grouped under one path item.
pub fn build<'a>(
    config: &ApiConfig,
    operations: impl IntoIterator<Item = &'a HandlerOperation>,
) -> OpenApi {
    let mut items: BTreeMap<&str, PathItemBuilder> = BTreeMap::new();
    for op in operations {
        let Some(method) = http_method(op.method()) else {
            tracing::warn!(
                method = %op.method(),
                path = op.path(),
                "method not representable in OpenAPI; skipped"
            );
            continue;
        };
        let item = items.remove(op.path()).unwrap_or_else(PathItemBuilder::new);
        items.insert(op.path(), item.operation(method, op.to_openapi()));
    }

    let paths = items
        .into_iter()
        .fold(PathsBuilder::new(), |paths, (path, item)| {
            paths.path(path, item.build())
        })
        .build();

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(config.title.clone())
                .version(config.version.clone())
                .build(),
        )
        .paths(paths)
        .components(Some(
            ComponentsBuilder::new()
                .schema(VALIDATION_ERROR_COMPONENT, validation_error_schema())
                .build(),
        ))
        .build()
}

/// Router serving `doc` as JSON at `path`.
pub fn router(doc: OpenApi, path: &str) -> Router {
    let doc = Arc::new(doc);
    Router::new().route(
        path,
        get(move || {
            let doc = Arc::clone(&doc);
            async move { Json(doc.as_ref().clone()) }
        }),
    )
}
