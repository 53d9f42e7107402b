//! # Registration & Dispatch
//!
//! [`ApiRouter`] collects decorated [`HandlerOperation`]s and turns them
//! into an `axum::Router`. For every request it:
//!
//! 1. collects the path parameters, the query string and the JSON body
//!    into a [`RequestInput`] (repeated query keys become arrays, an empty
//!    body becomes `null`),
//! 2. runs every pipe of the operation over every source,
//! 3. invokes the handler and awaits its (possibly output-validated)
//!    result,
//! 4. responds with the JSON value and the operation's success status, or
//!    with an [`ApiError`] body.
//!
//! The generated OpenAPI document is served at the configured docs path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::Method;
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodFilter, MethodRouter};
use axum::{Json, Router};
use serde_json::{Map, Value};
use utoipa::openapi::OpenApi;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::handler::{BoxHandler, RequestInput};
use crate::middleware;
use crate::openapi;
use crate::operation::{Binding, HandlerOperation};

/// Collects operations and builds the HTTP router.
#[derive(Debug)]
pub struct ApiRouter {
    config: ApiConfig,
    operations: Vec<Arc<HandlerOperation>>,
}

impl ApiRouter {
    /// An empty router.
    pub fn new(config: ApiConfig) -> Self {
        Self {
            config,
            operations: Vec::new(),
        }
    }

    /// Configuration this router was created with.
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Register an already decorated operation.
    ///
    /// Registering the same method and path twice replaces the earlier
    /// operation.
    pub fn operation(mut self, operation: HandlerOperation) -> Self {
        if let Some(pos) = self
            .operations
            .iter()
            .position(|op| op.method() == operation.method() && op.path() == operation.path())
        {
            tracing::warn!(
                method = %operation.method(),
                path = operation.path(),
                "operation registered twice; replacing"
            );
            self.operations.remove(pos);
        }
        tracing::debug!(
            method = %operation.method(),
            path = operation.path(),
            pipes = operation.pipes().len(),
            "operation registered"
        );
        self.operations.push(Arc::new(operation));
        self
    }

    /// Register `handler` at `method path`, decorated by `bindings` in order.
    pub fn route(
        self,
        method: Method,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        let operation = bindings.into_iter().fold(
            HandlerOperation::new(method, path, handler),
            HandlerOperation::with,
        );
        self.operation(operation)
    }

    /// Register a `GET` route.
    pub fn get(
        self,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        self.route(Method::GET, path, handler, bindings)
    }

    /// Register a `POST` route.
    pub fn post(
        self,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        self.route(Method::POST, path, handler, bindings)
    }

    /// Register a `PUT` route.
    pub fn put(
        self,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        self.route(Method::PUT, path, handler, bindings)
    }

    /// Register a `PATCH` route.
    pub fn patch(
        self,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        self.route(Method::PATCH, path, handler, bindings)
    }

    /// Register a `DELETE` route.
    pub fn delete(
        self,
        path: &str,
        handler: BoxHandler,
        bindings: impl IntoIterator<Item = Binding>,
    ) -> Self {
        self.route(Method::DELETE, path, handler, bindings)
    }

    /// Registered operations, in registration order.
    pub fn operations(&self) -> impl Iterator<Item = &HandlerOperation> {
        self.operations.iter().map(Arc::as_ref)
    }

    /// The OpenAPI document for the registered operations.
    pub fn openapi(&self) -> OpenApi {
        openapi::build(&self.config, self.operations())
    }

    /// Build the `axum::Router`, with tracing and metrics layers applied.
    pub fn into_router(self) -> Router {
        let doc = self
            .config
            .docs_path
            .as_ref()
            .map(|path| (path.clone(), self.openapi()));

        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for op in self.operations {
            let filter = match MethodFilter::try_from(op.method().clone()) {
                Ok(filter) => filter,
                Err(_) => {
                    tracing::warn!(
                        method = %op.method(),
                        path = op.path(),
                        "unsupported method; route skipped"
                    );
                    continue;
                }
            };
            let path = op.path().to_string();
            let method_router = by_path.remove(&path).unwrap_or_else(MethodRouter::new);
            by_path.insert(path, method_router.on(filter, endpoint(op)));
        }

        let mut router = by_path
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods));

        if let Some((path, doc)) = doc {
            router = router.merge(openapi::router(doc, &path));
        }

        router
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(middleware::tracing_layer::layer())
    }
}

type PathParams = Result<Path<HashMap<String, String>>, PathRejection>;
type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

fn endpoint(
    op: Arc<HandlerOperation>,
) -> impl Fn(PathParams, QueryPairs, Bytes) -> futures::future::BoxFuture<'static, Response>
       + Clone
       + Send
       + Sync
       + 'static {
    use futures::FutureExt;
    move |path, query, body| {
        let op = Arc::clone(&op);
        async move { dispatch(&op, path, query, body).await }.boxed()
    }
}

async fn dispatch(
    op: &HandlerOperation,
    path: PathParams,
    query: QueryPairs,
    body: Bytes,
) -> Response {
    let input = match collect_input(path, query, &body) {
        Ok(input) => input,
        Err(err) => return err.into_response(),
    };
    match op.call(input).await {
        Ok(value) => (op.success_status(), Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn collect_input(
    path: PathParams,
    query: QueryPairs,
    body: &[u8],
) -> Result<RequestInput, ApiError> {
    let params = match path {
        Ok(Path(map)) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ),
        Err(PathRejection::MissingPathParams(_)) => Value::Object(Map::new()),
        Err(rejection) => return Err(ApiError::Malformed(rejection.body_text())),
    };
    let query = match query {
        Ok(Query(pairs)) => query_object(pairs),
        Err(rejection) => return Err(ApiError::Malformed(rejection.body_text())),
    };
    Ok(RequestInput::new(params, query, parse_body(body)?))
}

/// Fold query pairs into an object. A key seen more than once maps to an
/// array of its values, in order of appearance.
pub(crate) fn query_object(pairs: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in pairs {
        match object.get_mut(&key) {
            None => {
                object.insert(key, Value::String(value));
            }
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Value::Object(object)
}

fn parse_body(body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Malformed(format!("invalid JSON body: {e}")))
}
